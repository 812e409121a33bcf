//! # Inline Scanning
//!
//! Line-local recognition of paired comment markers and ruby glosses.
//!
//! ## Modules
//!
//! - **`escape`**: `EscapeRuns` backslash run table
//! - **`cursor`**: `Cursor` with escape-aware marker search
//! - **`pairs`**: `scan_marker_pairs()` for star and percent comments
//! - **`ruby`**: `scan_ruby()`, `merge_ranges()`
//! - **`types`**: `AnnotationKind`, `AnnotationRange`
//!
//! Markers take precedence over glosses: a gloss that intersects any comment
//! range is dropped from the merged list.

pub mod cursor;
pub mod escape;
pub mod pairs;
pub mod ruby;
pub mod types;

use marginalia_config::Settings;

pub use escape::{EscapeRuns, escape_run_before, is_escaped_at};
pub use pairs::{MarkerSet, scan_marker_pairs};
pub use ruby::{RubyParts, gloss_parts, merge_ranges, scan_ruby};
pub use types::{AnnotationKind, AnnotationRange};

use crate::kinds::{self, RubyGloss};
use crate::span::Span;

/// Scans `text` for every inline-mode comment pair and, when enabled, ruby
/// glosses. Line and paragraph mode kinds are not paired here.
pub fn scan_inline_ranges(text: &str, settings: &Settings) -> Vec<AnnotationRange> {
    let markers = MarkerSet::inline(settings);
    let markers = MarkerSet {
        star: markers.star && text.contains(kinds::StarComment::MARK),
        percent: markers.percent && text.contains(kinds::PercentComment::MARK),
    };
    let ruby = settings.ruby() && text.contains(RubyGloss::OPEN);
    if markers.is_empty() && !ruby {
        return Vec::new();
    }

    let runs = EscapeRuns::new(text);
    let pairs = scan_marker_pairs(text, markers, &runs);
    if !ruby {
        return pairs;
    }
    merge_ranges(pairs, scan_ruby(text, Span::new(0, text.len())))
}
