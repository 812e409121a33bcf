/// A byte range `[start, end)` into a scanned buffer.
///
/// Ranges always store byte offsets so they slice the buffer directly;
/// [`Span::to_chars`] converts for callers that count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length in bytes. Uses saturating subtraction for safety.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty (start >= end).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// True when the two half-open ranges share at least one byte.
    #[must_use]
    pub fn intersects(self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Converts byte offsets into character offsets within `text`.
    #[must_use]
    pub fn to_chars(self, text: &str) -> Span {
        let start = text[..self.start].chars().count();
        let len = text[self.start..self.end].chars().count();
        Span {
            start,
            end: start + len,
        }
    }

    /// Shifts both ends by `offset`.
    #[must_use]
    pub fn shift(self, offset: usize) -> Span {
        Span {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn len_and_empty() {
        assert_eq!(Span::new(2, 5).len(), 3);
        assert!(Span::new(4, 4).is_empty());
        assert!(Span::new(5, 4).is_empty());
    }

    #[test]
    fn intersects_is_half_open() {
        let a = Span::new(0, 3);
        assert!(a.intersects(Span::new(2, 6)));
        assert!(!a.intersects(Span::new(3, 6)));
        assert!(Span::new(0, 10).contains(Span::new(3, 6)));
        assert!(!Span::new(0, 5).contains(Span::new(3, 6)));
    }

    #[test]
    fn to_chars_counts_multibyte() {
        let text = "A★B★C";
        let bytes = Span::new(1, 8);
        assert_eq!(&text[bytes.start..bytes.end], "★B★");
        assert_eq!(bytes.to_chars(text), Span::new(1, 4));
    }
}
