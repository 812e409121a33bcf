use regex::Regex;
use std::sync::OnceLock;

use super::types::{AnnotationKind, AnnotationRange};
use crate::kinds::RubyGloss;
use crate::span::Span;

static RUBY_REGEX: OnceLock<Regex> = OnceLock::new();

/// Base: Han, ASCII alphanumerics, `.`, `-`, `_`. Reading: anything up to
/// the closing bracket. The `<ruby>` wrapper only matches when both tags
/// are present; leftmost-first alternation prefers the wrapped form.
fn ruby_regex() -> &'static Regex {
    RUBY_REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)<ruby>([\p{Han}0-9A-Za-z.\-_]+)《([^》]+?)》</ruby>|([\p{Han}0-9A-Za-z.\-_]+)《([^》]+?)》",
        )
        .expect("Invalid ruby regex")
    })
}

/// The pieces of one gloss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RubyParts<'a> {
    pub base: &'a str,
    pub reading: &'a str,
    /// Whether the match carried its own `<ruby>…</ruby>` wrapper.
    pub wrapped: bool,
}

/// Finds glosses inside `segment` of `text`. Offsets are relative to `text`.
pub fn scan_ruby(text: &str, segment: Span) -> Vec<AnnotationRange> {
    let end = segment.end.min(text.len());
    if segment.start >= end {
        return Vec::new();
    }
    let slice = &text[segment.start..end];
    if !slice.contains(RubyGloss::OPEN) {
        return Vec::new();
    }
    ruby_regex()
        .find_iter(slice)
        .map(|m| {
            let span = Span::new(m.start(), m.end()).shift(segment.start);
            AnnotationRange::new(AnnotationKind::Ruby, text, span)
        })
        .collect()
}

/// Splits the text of a ruby range into base and reading.
pub fn gloss_parts(range_text: &str) -> Option<RubyParts<'_>> {
    let caps = ruby_regex().captures(range_text)?;
    if let (Some(base), Some(reading)) = (caps.get(1), caps.get(2)) {
        return Some(RubyParts {
            base: base.as_str(),
            reading: reading.as_str(),
            wrapped: true,
        });
    }
    Some(RubyParts {
        base: caps.get(3)?.as_str(),
        reading: caps.get(4)?.as_str(),
        wrapped: false,
    })
}

/// Interleaves gloss ranges into marker ranges by start offset. Markers win:
/// a gloss intersecting any marker range is dropped. Both inputs must be
/// sorted.
pub fn merge_ranges(markers: Vec<AnnotationRange>, ruby: Vec<AnnotationRange>) -> Vec<AnnotationRange> {
    if ruby.is_empty() {
        return markers;
    }
    let mut out = Vec::with_capacity(markers.len() + ruby.len());
    let mut markers = markers.into_iter().peekable();
    let mut blockers: Vec<Span> = Vec::new();

    for gloss in ruby {
        while let Some(next) = markers.next_if(|m| m.span.start < gloss.span.end) {
            blockers.push(next.span);
            out.push(next);
        }
        let blocked = blockers
            .iter()
            .rev()
            .take_while(|b| b.end > gloss.span.start)
            .any(|b| b.intersects(gloss.span));
        if !blocked {
            let at = out.partition_point(|r| r.span.start <= gloss.span.start);
            out.insert(at, gloss);
        }
    }
    out.extend(markers);
    out
}
