//! Line and paragraph mode classification.
//!
//! A line qualifies for a kind when, after leading spaces and tabs, it starts
//! with that kind's unescaped marker. Paragraph mode extends the test of the
//! first line of a blank-line-delimited block to every line of the block.

use marginalia_config::{CommentKind, Settings};
use std::ops::Range;

use crate::kinds;
use crate::scan::cursor::Cursor;
use crate::scan::escape::EscapeRuns;
use crate::scan::types::AnnotationRange;
use crate::span::Span;

/// Offset of the marker when `line` starts with `kind`'s marker.
pub fn starts_with_marker(line: &str, kind: CommentKind) -> Option<usize> {
    marker_at_line_start(line, Span::new(0, line.len()), kind, &EscapeRuns::new(line))
}

/// [`starts_with_marker`] for the line `line` of a larger buffer whose
/// escape table is already built. Returns a buffer offset.
pub fn marker_at_line_start(buffer: &str, line: Span, kind: CommentKind, runs: &EscapeRuns) -> Option<usize> {
    let mark = kinds::marker(kind);
    let mut cur = Cursor::new(&buffer[..line.end]);
    cur.bump_n(line.start);
    cur.skip_blanks();
    let at = cur.i;
    let qualifies = cur.starts_with(mark)
        && !runs.is_escaped(at)
        && !runs.is_literal(Span::new(at, at + mark.len()));
    qualifies.then_some(at)
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// The whole-line range for the first line-mode kind `line` starts with.
/// Runs from the marker to the end of the line, excluding a line terminator.
pub fn line_mode_range(line: &str, settings: &Settings) -> Option<AnnotationRange> {
    line_mode_range_in(line, Span::new(0, line.len()), settings, &EscapeRuns::new(line))
}

/// [`line_mode_range`] for one line of a larger buffer. The range is in
/// buffer offsets.
pub fn line_mode_range_in(
    buffer: &str,
    line: Span,
    settings: &Settings,
    runs: &EscapeRuns,
) -> Option<AnnotationRange> {
    let body = buffer[line.start..line.end].trim_end_matches(['\r', '\n']);
    let line = Span::new(line.start, line.start + body.len());
    CommentKind::ALL
        .into_iter()
        .filter(|&kind| settings.comment(kind).is_line())
        .find_map(|kind| {
            let start = marker_at_line_start(buffer, line, kind, runs)?;
            Some(AnnotationRange::new(
                kind.into(),
                buffer,
                Span::new(start, line.end),
            ))
        })
}

/// The paragraph-mode kind a block starting with `line` belongs to.
pub fn paragraph_kind(line: &str, settings: &Settings) -> Option<CommentKind> {
    paragraph_kind_in(line, Span::new(0, line.len()), settings, &EscapeRuns::new(line))
}

/// [`paragraph_kind`] for one line of a larger buffer.
pub fn paragraph_kind_in(
    buffer: &str,
    line: Span,
    settings: &Settings,
    runs: &EscapeRuns,
) -> Option<CommentKind> {
    CommentKind::ALL
        .into_iter()
        .filter(|&kind| settings.comment(kind).is_paragraph())
        .find(|&kind| marker_at_line_start(buffer, line, kind, runs).is_some())
}

/// Host line indices (verbatim or code regions) that never qualify.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredLines {
    ranges: Vec<Range<usize>>,
}

impl IgnoredLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from half-open line ranges in any order.
    pub fn from_ranges(ranges: impl IntoIterator<Item = Range<usize>>) -> Self {
        let mut sorted: Vec<Range<usize>> = ranges.into_iter().filter(|r| r.start < r.end).collect();
        sorted.sort_by_key(|r| r.start);

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        Self { ranges: merged }
    }

    pub fn contains(&self, line: usize) -> bool {
        let at = self.ranges.partition_point(|r| r.end <= line);
        self.ranges.get(at).is_some_and(|r| r.start <= line)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    LeadingBlank,
    InBlock(Option<CommentKind>),
    BlockClosed,
}

/// Paragraph kind of every line in `window`, one entry per line.
///
/// A block's kind comes from its first non-blank line. Ignored lines get no
/// kind and leave the state untouched, so they neither open nor close a
/// block.
pub fn classify_blocks<S: AsRef<str>>(
    lines: &[S],
    window: Range<usize>,
    settings: &Settings,
    ignored: &IgnoredLines,
) -> Vec<Option<CommentKind>> {
    let window = window.start.min(lines.len())..window.end.min(lines.len());
    let mut out = Vec::with_capacity(window.len());
    let paragraphs = CommentKind::ALL
        .into_iter()
        .any(|kind| settings.comment(kind).is_paragraph());
    if !paragraphs {
        out.resize(window.len(), None);
        return out;
    }

    let mut state = BlockState::LeadingBlank;
    for i in window {
        if ignored.contains(i) {
            out.push(None);
            continue;
        }
        let line = lines[i].as_ref();
        state = match (state, is_blank(line)) {
            (BlockState::InBlock(_), true) => BlockState::BlockClosed,
            (BlockState::InBlock(kind), false) => BlockState::InBlock(kind),
            (_, true) => state,
            (_, false) => BlockState::InBlock(paragraph_kind(line, settings)),
        };
        out.push(match state {
            BlockState::InBlock(kind) => kind,
            BlockState::LeadingBlank | BlockState::BlockClosed => None,
        });
    }
    out
}
