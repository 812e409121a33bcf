//! # Incremental Analyzer
//!
//! Runs the classifier and the inline scanners over a whole document or a
//! window of it, reusing line scans from a bounded LRU cache.
//!
//! The cache is keyed by line text and only holds the configuration-dependent,
//! line-local part of a result ([`LineScan`]). Every entry of a state was
//! scanned under the state's one fingerprint.
//! Paragraph kinds depend on neighbouring lines and are recomputed on every
//! call. A state built under one fingerprint is discarded when a call brings
//! a different one.
//!
//! ```
//! use marginalia_config::Options;
//! use marginalia_engine::analyzer::{AnalyzeOptions, analyze_all, analyze_window};
//!
//! let settings = Options { star_comment: true, ..Options::default() }.normalize();
//! let lines = ["a ★b★", "", "c"];
//! let first = analyze_all(&lines, &settings, None, &AnalyzeOptions::default());
//! let again = analyze_window(&lines, &settings, 0, 1, Some(first.state), &AnalyzeOptions::default());
//! assert_eq!(again.stats.cache_hits, 1);
//! ```

pub mod window;

pub use window::{
    FullAnalyzeThreshold, expand_to_paragraph_boundaries, normalize_window, should_full_analyze,
};

use lru::LruCache;
use marginalia_config::{CommentKind, Fingerprint, Settings};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;

use crate::classify::{IgnoredLines, classify_blocks, line_mode_range};
use crate::scan::{AnnotationRange, scan_inline_ranges};

pub const DEFAULT_CACHE_LIMIT: NonZeroUsize = NonZeroUsize::new(4096).unwrap();

/// The cached, line-local result of scanning one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineScan {
    pub inline_ranges: Vec<AnnotationRange>,
    pub line_mode_range: Option<AnnotationRange>,
}

impl LineScan {
    pub fn scan(line: &str, settings: &Settings) -> Self {
        Self {
            inline_ranges: scan_inline_ranges(line, settings),
            line_mode_range: line_mode_range(line, settings),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inline_ranges.is_empty() && self.line_mode_range.is_none()
    }
}

/// One analyzed line. Records are superseded on re-analysis, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Absolute line index in the document.
    pub index: usize,
    pub text: String,
    pub scan: Arc<LineScan>,
    /// Set only when the kind's paragraph mode is on and the block's leading
    /// line qualifies.
    pub paragraph: Option<CommentKind>,
}

impl LineRecord {
    pub fn inline_ranges(&self) -> &[AnnotationRange] {
        &self.scan.inline_ranges
    }

    pub fn line_mode_range(&self) -> Option<&AnnotationRange> {
        self.scan.line_mode_range.as_ref()
    }
}

/// Cache carried between analyzer calls. Taken by value, so one state can
/// never serve two calls at once.
pub struct AnalyzerState {
    cache: LruCache<String, Arc<LineScan>>,
    fingerprint: Fingerprint,
}

impl AnalyzerState {
    pub fn new(fingerprint: Fingerprint, limit: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(limit),
            fingerprint,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn cache_limit(&self) -> NonZeroUsize {
        self.cache.cap()
    }

    /// Keeps `previous` when it was built under `fingerprint`, otherwise
    /// starts empty.
    fn reuse(previous: Option<AnalyzerState>, fingerprint: Fingerprint, limit: NonZeroUsize) -> Self {
        match previous {
            Some(mut state) if state.fingerprint == fingerprint => {
                if state.cache.cap() != limit {
                    state.cache.resize(limit);
                }
                state
            }
            Some(state) => {
                log::debug!(
                    "discarding analyzer cache of {} lines: fingerprint {:#x} -> {:#x}",
                    state.len(),
                    state.fingerprint.bits(),
                    fingerprint.bits()
                );
                Self::new(fingerprint, limit)
            }
            None => Self::new(fingerprint, limit),
        }
    }

    /// Returns the scan for `line` and whether it came from the cache.
    fn scan_line(&mut self, line: &str, settings: &Settings) -> (Arc<LineScan>, bool) {
        if let Some(hit) = self.cache.get(line) {
            return (Arc::clone(hit), true);
        }
        let scan = Arc::new(LineScan::scan(line, settings));
        self.cache.put(line.to_string(), Arc::clone(&scan));
        (scan, false)
    }
}

impl std::fmt::Debug for AnalyzerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerState")
            .field("fingerprint", &self.fingerprint)
            .field("len", &self.cache.len())
            .field("cap", &self.cache.cap())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzeStats {
    pub cache_hits: usize,
    /// Total lines in the document.
    pub line_count: usize,
    pub analyzed_count: usize,
    pub analyzed_from: usize,
    pub analyzed_to: usize,
}

#[derive(Debug)]
pub struct Analysis {
    /// Records for the analyzed lines only, in document order.
    pub lines: Vec<LineRecord>,
    pub state: AnalyzerState,
    pub stats: AnalyzeStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Cache bound. Zero falls back to [`DEFAULT_CACHE_LIMIT`].
    pub cache_limit: usize,
    /// Host lines (code or verbatim regions) that never qualify.
    pub ignored: IgnoredLines,
    /// Widen windows to blank-line boundaries. On by default.
    pub expand_to_paragraphs: bool,
    /// Extra lines analyzed on each side of a window.
    pub context_lines: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            cache_limit: DEFAULT_CACHE_LIMIT.get(),
            ignored: IgnoredLines::default(),
            expand_to_paragraphs: true,
            context_lines: 0,
        }
    }
}

impl AnalyzeOptions {
    fn limit(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_limit).unwrap_or(DEFAULT_CACHE_LIMIT)
    }
}

/// Analyzes every line. Cache entries from `previous` are reused only when
/// it was built under the same fingerprint.
pub fn analyze_all<S: AsRef<str>>(
    lines: &[S],
    settings: &Settings,
    previous: Option<AnalyzerState>,
    options: &AnalyzeOptions,
) -> Analysis {
    analyze_range(lines, settings, 0..lines.len(), previous, options)
}

/// Analyzes `from..to` after clamping it, widening it to blank-line
/// boundaries (unless disabled) and padding it with context lines. Only the
/// window's records are returned.
pub fn analyze_window<S: AsRef<str>>(
    lines: &[S],
    settings: &Settings,
    from: usize,
    to: usize,
    previous: Option<AnalyzerState>,
    options: &AnalyzeOptions,
) -> Analysis {
    let count = lines.len();
    let window = if options.expand_to_paragraphs {
        expand_to_paragraph_boundaries(lines, from, to)
    } else {
        normalize_window(count, from, to)
    };
    let context = options.context_lines.min(count);
    let window = window.start.saturating_sub(context)..(window.end + context).min(count);
    analyze_range(lines, settings, window, previous, options)
}

fn analyze_range<S: AsRef<str>>(
    lines: &[S],
    settings: &Settings,
    window: Range<usize>,
    previous: Option<AnalyzerState>,
    options: &AnalyzeOptions,
) -> Analysis {
    let mut state = AnalyzerState::reuse(previous, settings.fingerprint(), options.limit());
    let paragraphs = classify_blocks(lines, window.clone(), settings, &options.ignored);
    let ignored_scan = Arc::new(LineScan::default());

    let mut cache_hits = 0;
    let mut records = Vec::with_capacity(window.len());
    for (index, paragraph) in window.clone().zip(paragraphs) {
        let text = lines[index].as_ref();
        let scan = if options.ignored.contains(index) {
            Arc::clone(&ignored_scan)
        } else {
            let (scan, hit) = state.scan_line(text, settings);
            cache_hits += usize::from(hit);
            scan
        };
        records.push(LineRecord {
            index,
            text: text.to_string(),
            scan,
            paragraph,
        });
    }

    Analysis {
        stats: AnalyzeStats {
            cache_hits,
            line_count: lines.len(),
            analyzed_count: records.len(),
            analyzed_from: window.start,
            analyzed_to: window.end,
        },
        lines: records,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_config::Options;
    use pretty_assertions::assert_eq;

    fn star_paragraphs() -> Settings {
        Options {
            star_comment: true,
            star_comment_paragraph: true,
            percent_comment: true,
            percent_comment_line: true,
            ..Options::default()
        }
        .normalize()
    }

    const LINES: [&str; 6] = [
        "",
        "★段落コメントです。",
        "続きです。",
        "",
        "%%line note",
        "通常文です。",
    ];

    #[test]
    fn analyzer_state_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AnalyzerState>();
        assert_send::<Analysis>();
    }

    #[test]
    fn window_expands_and_reuses_cache() {
        let settings = star_paragraphs();
        let options = AnalyzeOptions::default();

        let first = analyze_window(&LINES, &settings, 2, 3, None, &options);
        assert_eq!(first.stats.analyzed_from, 1);
        assert_eq!(first.stats.analyzed_to, 3);
        assert_eq!(first.stats.analyzed_count, 2);
        assert_eq!(first.stats.line_count, 6);
        assert_eq!(first.stats.cache_hits, 0);
        assert!(
            first
                .lines
                .iter()
                .all(|r| r.paragraph == Some(CommentKind::Star))
        );

        let ranges: Vec<_> = first.lines.iter().map(|r| r.scan.clone()).collect();
        let second = analyze_window(&LINES, &settings, 1, 3, Some(first.state), &options);
        assert!(second.stats.cache_hits >= 2);
        let again: Vec<_> = second.lines.iter().map(|r| r.scan.clone()).collect();
        assert_eq!(again, ranges);
    }

    #[test]
    fn line_mode_range_is_recorded() {
        let analysis = analyze_all(&LINES, &star_paragraphs(), None, &AnalyzeOptions::default());
        let line = &analysis.lines[4];
        assert_eq!(line.line_mode_range().map(|r| r.text.as_str()), Some("%%line note"));
        assert_eq!(line.paragraph, None);
        assert!(analysis.lines[5].scan.is_empty());
    }

    #[test]
    fn fingerprint_change_discards_cache() {
        let lines = ["★a★"];
        let star = Options {
            star_comment: true,
            ..Options::default()
        }
        .normalize();
        let percent = Options {
            percent_comment: true,
            ..Options::default()
        }
        .normalize();

        let first = analyze_all(&lines, &star, None, &AnalyzeOptions::default());
        assert_eq!(first.lines[0].inline_ranges().len(), 1);
        let second = analyze_all(&lines, &percent, Some(first.state), &AnalyzeOptions::default());
        assert_eq!(second.stats.cache_hits, 0);
        assert_eq!(second.state.len(), 1);
        assert_eq!(second.state.fingerprint(), percent.fingerprint());
        assert!(second.lines[0].inline_ranges().is_empty());
    }

    #[test]
    fn repeated_line_shares_one_entry() {
        let settings = star_paragraphs();
        let mut state = AnalyzerState::new(settings.fingerprint(), DEFAULT_CACHE_LIMIT);
        let (first, hit) = state.scan_line("a ★b★", &settings);
        assert!(!hit);

        let owned = format!("a {}", "★b★");
        let (second, hit) = state.scan_line(&owned, &settings);
        assert!(hit);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn cache_is_bounded() {
        let settings = star_paragraphs();
        let lines: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
        let options = AnalyzeOptions {
            cache_limit: 8,
            ..AnalyzeOptions::default()
        };
        let analysis = analyze_all(&lines, &settings, None, &options);
        assert_eq!(analysis.state.len(), 8);
        assert_eq!(analysis.state.cache_limit().get(), 8);

        let zero = AnalyzeOptions {
            cache_limit: 0,
            ..AnalyzeOptions::default()
        };
        let analysis = analyze_all(&lines, &settings, Some(analysis.state), &zero);
        assert_eq!(analysis.state.cache_limit(), DEFAULT_CACHE_LIMIT);
    }

    #[test]
    fn ignored_lines_are_not_scanned() {
        let settings = star_paragraphs();
        let options = AnalyzeOptions {
            ignored: IgnoredLines::from_ranges([4..5]),
            ..AnalyzeOptions::default()
        };
        let analysis = analyze_all(&LINES, &settings, None, &options);
        assert!(analysis.lines[4].scan.is_empty());
        assert_eq!(analysis.state.len(), 4);
    }

    #[test]
    fn window_without_expansion_uses_context() {
        let options = AnalyzeOptions {
            expand_to_paragraphs: false,
            context_lines: 1,
            ..AnalyzeOptions::default()
        };
        let analysis = analyze_window(&LINES, &star_paragraphs(), 4, 5, None, &options);
        assert_eq!(analysis.stats.analyzed_from, 3);
        assert_eq!(analysis.stats.analyzed_to, 6);
        assert_eq!(
            analysis.lines.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![3, 4, 5]
        );
    }

    #[test]
    fn empty_document_keeps_matching_state() {
        let settings = star_paragraphs();
        let first = analyze_all(&LINES, &settings, None, &AnalyzeOptions::default());
        let cached = first.state.len();
        let empty: [&str; 0] = [];
        let second = analyze_all(&empty, &settings, Some(first.state), &AnalyzeOptions::default());
        assert!(second.lines.is_empty());
        assert_eq!(second.stats, AnalyzeStats::default());
        assert_eq!(second.state.len(), cached);
    }
}
