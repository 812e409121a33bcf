/// Star comment: `★text★`.
pub struct StarComment;

impl StarComment {
    /// A single black star opens and closes the span.
    pub const MARK: &'static str = "★";
}
