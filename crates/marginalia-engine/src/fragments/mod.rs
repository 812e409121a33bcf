//! # Fragments
//!
//! The host's intermediate representation of one inline run: text pieces
//! interleaved with foreign markup and line breaks.
//!
//! ## Modules
//!
//! - **`nesting`**: `Nesting` open/close matching and malformed detection
//! - **`reconcile`**: `annotate()` splices containers, deletions and glosses
//!   into a fragment sequence
//!
//! Ranges are found on the *buffer*, the concatenation of every text-bearing
//! fragment. [`TextIndex`] maps buffer offsets back to fragments.

pub mod nesting;
pub mod reconcile;

pub use nesting::Nesting;
pub use reconcile::{AnnotateOptions, Annotated, ParagraphAction, annotate};

use regex::Regex;
use std::sync::OnceLock;

use crate::span::Span;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"^<\s*(/)?\s*([A-Za-z][\w:-]*)").expect("Invalid tag regex"))
}

const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// One atomic unit of a host inline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Unescaped text content.
    Text(String),
    /// An element start tag. `name` is lowercase. `source` is the host
    /// syntax the tag was produced from, such as `**`, if any.
    Open {
        name: String,
        raw: String,
        source: Option<String>,
    },
    /// An element end tag. `name` is lowercase.
    Close {
        name: String,
        raw: String,
        source: Option<String>,
    },
    /// Self-contained markup: void tags, comments, code spans, images.
    Void { raw: String },
    /// A line break; contributes `\n` to the buffer.
    LineBreak { raw: String },
}

impl Fragment {
    pub fn text(s: impl Into<String>) -> Self {
        Fragment::Text(s.into())
    }

    pub fn soft_break() -> Self {
        Fragment::LineBreak {
            raw: "\n".to_string(),
        }
    }

    /// Classifies a piece of raw inline HTML.
    pub fn html(raw: &str) -> Self {
        let trimmed = raw.trim();
        let Some(caps) = tag_regex().captures(trimmed) else {
            return Fragment::Void {
                raw: raw.to_string(),
            };
        };
        let name = caps
            .get(2)
            .map_or_else(String::new, |m| m.as_str().to_ascii_lowercase());
        let raw = raw.to_string();
        if caps.get(1).is_some() {
            Fragment::Close { name, raw, source: None }
        } else if trimmed.ends_with("/>") || VOID_TAGS.contains(&name.as_str()) {
            Fragment::Void { raw }
        } else {
            Fragment::Open { name, raw, source: None }
        }
    }

    /// Attaches host source text to an open or close tag. When a range
    /// crosses the element, the text is kept in place of the tag.
    pub fn with_source(mut self, text: impl Into<String>) -> Self {
        if let Fragment::Open { source, .. } | Fragment::Close { source, .. } = &mut self {
            *source = Some(text.into());
        }
        self
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Fragment::Open { source, .. } | Fragment::Close { source, .. } => source.as_deref(),
            _ => None,
        }
    }

    /// Element name of an open or close tag.
    pub fn name(&self) -> Option<&str> {
        match self {
            Fragment::Open { name, .. } | Fragment::Close { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_open(&self, tag: &str) -> bool {
        matches!(self, Fragment::Open { name, .. } if name == tag)
    }

    pub fn is_close(&self, tag: &str) -> bool {
        matches!(self, Fragment::Close { name, .. } if name == tag)
    }

    /// What the fragment contributes to the scanned buffer.
    pub fn buffer_text(&self) -> Option<&str> {
        match self {
            Fragment::Text(text) => Some(text),
            Fragment::LineBreak { .. } => Some("\n"),
            _ => None,
        }
    }
}

/// The scanned buffer of a fragment run and where each fragment sits in it.
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    buffer: String,
    /// Per fragment; markup gets an empty span at its position.
    segments: Vec<Span>,
    /// Indices of fragments with non-empty buffer text, in order.
    bearing: Vec<usize>,
}

impl TextIndex {
    pub fn new(fragments: &[Fragment]) -> Self {
        let mut buffer = String::new();
        let mut segments = Vec::with_capacity(fragments.len());
        let mut bearing = Vec::new();
        for (i, fragment) in fragments.iter().enumerate() {
            let start = buffer.len();
            if let Some(text) = fragment.buffer_text() {
                buffer.push_str(text);
                if !text.is_empty() {
                    bearing.push(i);
                }
            }
            segments.push(Span::new(start, buffer.len()));
        }
        Self {
            buffer,
            segments,
            bearing,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn segment(&self, index: usize) -> Span {
        self.segments[index]
    }

    /// Fragment holding buffer byte `byte`, with the byte's local offset.
    pub fn locate(&self, byte: usize) -> Option<(usize, usize)> {
        let at = self
            .bearing
            .partition_point(|&f| self.segments[f].end <= byte);
        let fragment = *self.bearing.get(at)?;
        let segment = self.segments[fragment];
        (segment.start <= byte).then(|| (fragment, byte - segment.start))
    }

    /// Text-bearing fragments intersecting `span`, with the local part of
    /// `span` inside each.
    pub fn pieces(&self, span: Span) -> impl Iterator<Item = (usize, Span)> + '_ {
        let first = self
            .bearing
            .partition_point(|&f| self.segments[f].end <= span.start);
        self.bearing[first..]
            .iter()
            .map(|&f| (f, self.segments[f]))
            .take_while(move |(_, segment)| segment.start < span.end)
            .map(move |(f, segment)| {
                let start = span.start.max(segment.start) - segment.start;
                let end = span.end.min(segment.end) - segment.start;
                (f, Span::new(start, end))
            })
    }
}
