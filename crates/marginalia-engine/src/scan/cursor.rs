use super::escape::EscapeRuns;
use crate::span::Span;

/// A forward-only cursor over a scanned buffer.
///
/// Every search method returns offsets local to `s`, which for the scanners
/// is always the whole buffer, so they double as range offsets.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The buffer being scanned.
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Returns true if at end of string.
    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// Peeks at the current byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    /// Checks if the remaining input starts with the given pattern.
    pub fn starts_with(&self, pat: &str) -> bool {
        self.s.as_bytes()[self.i.min(self.s.len())..].starts_with(pat.as_bytes())
    }

    /// Advances by `n` bytes.
    pub fn bump_n(&mut self, n: usize) {
        self.i += n;
    }

    /// Advances past any run of spaces and tabs.
    pub fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.i += 1;
        }
    }

    /// Finds the next occurrence of `mark` at or after the cursor that is not
    /// preceded by an odd backslash run and covers no host-unescaped
    /// character. Does not move the cursor.
    ///
    /// After an escaped candidate the search resumes one character later, so
    /// overlapping candidates such as the second `%%` in `\%%%` are seen.
    pub fn find_unescaped(&self, mark: &str, runs: &EscapeRuns) -> Option<usize> {
        let step = mark.chars().next().map_or(1, char::len_utf8);
        let mut from = self.i;
        while from < self.s.len() {
            let idx = from + self.s[from..].find(mark)?;
            if !runs.is_escaped(idx) && !runs.is_literal(Span::new(idx, idx + mark.len())) {
                return Some(idx);
            }
            from = idx + step;
        }
        None
    }
}
