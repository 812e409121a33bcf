//! # Annotation Kinds
//!
//! Types that own their syntax delimiters. Scanner, classifier and renderer
//! code call these constants; none of them hardcodes `★`, `%%` or `《`.
//!
//! - **`StarComment`**: `MARK = "★"`
//! - **`PercentComment`**: `MARK = "%%"`
//! - **`RubyGloss`**: `OPEN = '《'`, `CLOSE = '》'` plus the `<ruby>` wrapper
//! - **`Escape`**: `BACKSLASH = b'\\'`

pub mod escape;
pub mod percent;
pub mod ruby;
pub mod star;

pub use escape::Escape;
pub use percent::PercentComment;
pub use ruby::RubyGloss;
pub use star::StarComment;

use marginalia_config::CommentKind;

/// Marker string for a paired comment kind.
pub fn marker(kind: CommentKind) -> &'static str {
    match kind {
        CommentKind::Star => StarComment::MARK,
        CommentKind::Percent => PercentComment::MARK,
    }
}
