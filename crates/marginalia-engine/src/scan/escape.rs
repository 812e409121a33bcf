use crate::kinds::Escape;
use crate::span::Span;

/// Run-length table of escape characters.
///
/// Entry `i` is the number of consecutive backslashes ending just before
/// byte `i`. A buffer without any backslash never allocates the table.
///
/// A host that resolves its own escapes before handing text over can list
/// the offsets of the characters it unescaped. Those characters are literal:
/// a backslash among them does not escape, and a marker occurrence that
/// covers one is never a marker.
#[derive(Debug, Clone, Default)]
pub struct EscapeRuns {
    runs: Option<Vec<u32>>,
    literals: Vec<usize>,
}

impl EscapeRuns {
    pub fn new(text: &str) -> Self {
        Self::with_literals(text, &[])
    }

    /// Builds the table with host-unescaped byte offsets. `literals` may be
    /// in any order.
    pub fn with_literals(text: &str, literals: &[usize]) -> Self {
        let mut literals = literals.to_vec();
        literals.sort_unstable();
        literals.dedup();

        let bytes = text.as_bytes();
        if !bytes.contains(&Escape::BACKSLASH) {
            return Self {
                runs: None,
                literals,
            };
        }
        let mut runs = Vec::with_capacity(bytes.len() + 1);
        let mut run = 0u32;
        let mut next_literal = literals.iter().peekable();
        runs.push(0);
        for (i, &b) in bytes.iter().enumerate() {
            let literal = next_literal.next_if(|&&l| l <= i).is_some_and(|&l| l == i);
            run = if b == Escape::BACKSLASH && !literal {
                run + 1
            } else {
                0
            };
            runs.push(run);
        }
        Self {
            runs: Some(runs),
            literals,
        }
    }

    /// Length of the backslash run ending just before `offset`. Offsets past
    /// the end read the run at the end of the buffer.
    pub fn run_before(&self, offset: usize) -> usize {
        match &self.runs {
            Some(runs) => runs[offset.min(runs.len() - 1)] as usize,
            None => 0,
        }
    }

    /// A marker at `offset` is escaped when an odd run precedes it.
    pub fn is_escaped(&self, offset: usize) -> bool {
        self.run_before(offset) % 2 == 1
    }

    /// True when `span` covers a host-unescaped character.
    pub fn is_literal(&self, span: Span) -> bool {
        let at = self.literals.partition_point(|&l| l < span.start);
        self.literals.get(at).is_some_and(|&l| l < span.end)
    }
}

/// One-off backward count, for callers that query a single offset.
pub fn escape_run_before(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())]
        .iter()
        .rev()
        .take_while(|&&b| b == Escape::BACKSLASH)
        .count()
}

pub fn is_escaped_at(text: &str, offset: usize) -> bool {
    escape_run_before(text, offset) % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn no_backslash_skips_table() {
        let runs = EscapeRuns::new("plain ★text★");
        assert!(runs.runs.is_none());
        assert_eq!(runs.run_before(6), 0);
        assert!(!runs.is_escaped(6));
    }

    #[rstest]
    #[case(r"★", 0, 0)]
    #[case(r"\★", 1, 1)]
    #[case(r"\\★", 2, 2)]
    #[case(r"\\\★", 3, 3)]
    #[case(r"a\b★", 3, 0)]
    fn run_lengths(#[case] text: &str, #[case] offset: usize, #[case] expected: usize) {
        let runs = EscapeRuns::new(text);
        assert_eq!(runs.run_before(offset), expected);
        assert_eq!(escape_run_before(text, offset), expected);
        assert_eq!(runs.is_escaped(offset), expected % 2 == 1);
        assert_eq!(is_escaped_at(text, offset), expected % 2 == 1);
    }

    #[test]
    fn literal_backslash_does_not_escape() {
        let text = r"\★";
        let runs = EscapeRuns::with_literals(text, &[0]);
        assert_eq!(runs.run_before(1), 0);
        assert!(!runs.is_escaped(1));
    }

    #[test]
    fn literal_offsets_cover_spans() {
        let runs = EscapeRuns::with_literals("%%x%%", &[3, 0, 3]);
        assert!(runs.is_literal(Span::new(0, 2)));
        assert!(!runs.is_literal(Span::new(1, 3)));
        assert!(runs.is_literal(Span::new(2, 4)));
        assert!(!runs.is_literal(Span::new(4, 5)));
        assert!(!EscapeRuns::new("%%").is_literal(Span::new(0, 2)));
    }

    #[test]
    fn offset_past_end_reads_trailing_run() {
        let runs = EscapeRuns::new(r"\");
        assert!(runs.is_escaped(1));
        assert!(runs.is_escaped(50));
        assert_eq!(escape_run_before(r"\", 50), 1);
    }
}
