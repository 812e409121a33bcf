use marginalia_config::CommentKind;

use crate::span::Span;

/// What a recognized range is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Star,
    Percent,
    Ruby,
}

impl AnnotationKind {
    /// The comment kind, or `None` for ruby glosses.
    pub fn comment(self) -> Option<CommentKind> {
        match self {
            AnnotationKind::Star => Some(CommentKind::Star),
            AnnotationKind::Percent => Some(CommentKind::Percent),
            AnnotationKind::Ruby => None,
        }
    }
}

impl From<CommentKind> for AnnotationKind {
    fn from(kind: CommentKind) -> Self {
        match kind {
            CommentKind::Star => AnnotationKind::Star,
            CommentKind::Percent => AnnotationKind::Percent,
        }
    }
}

/// A recognized annotation inside a scanned buffer.
///
/// `span` is in buffer byte offsets and `text` is the exact slice it covers,
/// markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRange {
    pub kind: AnnotationKind,
    pub span: Span,
    pub text: String,
}

impl AnnotationRange {
    pub fn new(kind: AnnotationKind, buffer: &str, span: Span) -> Self {
        Self {
            kind,
            span,
            text: buffer[span.start..span.end].to_string(),
        }
    }

    /// The span in character offsets of `buffer`.
    pub fn char_span(&self, buffer: &str) -> Span {
        self.span.to_chars(buffer)
    }
}
