use std::ops::Range;

use crate::classify::is_blank;

pub const DEFAULT_THRESHOLD_LINES: usize = 100;
pub const DEFAULT_THRESHOLD_RATIO: f64 = 0.02;

/// When a partial edit is large enough to redo the whole document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullAnalyzeThreshold {
    /// Absolute changed-line count. Zero falls back to the default.
    pub lines: usize,
    /// Changed/total ratio. Non-positive or non-finite falls back to the
    /// default.
    pub ratio: f64,
}

impl Default for FullAnalyzeThreshold {
    fn default() -> Self {
        Self {
            lines: DEFAULT_THRESHOLD_LINES,
            ratio: DEFAULT_THRESHOLD_RATIO,
        }
    }
}

/// True when `changed` meets the absolute threshold or the ratio threshold of
/// `total`. Nothing changed, or an empty document, is never a full analysis.
pub fn should_full_analyze(changed: usize, total: usize, threshold: &FullAnalyzeThreshold) -> bool {
    if changed == 0 || total == 0 {
        return false;
    }
    let lines = if threshold.lines > 0 {
        threshold.lines
    } else {
        DEFAULT_THRESHOLD_LINES
    };
    let ratio = if threshold.ratio.is_finite() && threshold.ratio > 0.0 {
        threshold.ratio
    } else {
        DEFAULT_THRESHOLD_RATIO
    };
    let full = changed >= lines || changed as f64 / total as f64 >= ratio;
    log::debug!("full analysis for {changed}/{total} changed lines: {full}");
    full
}

/// Clamps a line window to `[0, line_count]`. A reversed window collapses
/// to its end.
pub fn normalize_window(line_count: usize, from: usize, to: usize) -> Range<usize> {
    let from = from.min(line_count);
    let to = to.min(line_count);
    if to < from { to..to } else { from..to }
}

/// Widens a window outward to the nearest blank lines so that no block is
/// classified from a partial view.
pub fn expand_to_paragraph_boundaries<S: AsRef<str>>(lines: &[S], from: usize, to: usize) -> Range<usize> {
    let Range { mut start, mut end } = normalize_window(lines.len(), from, to);
    while start > 0 && !is_blank(lines[start - 1].as_ref()) {
        start -= 1;
    }
    while end < lines.len() && !is_blank(lines[end].as_ref()) {
        end += 1;
    }
    start..end
}
