/// Percent comment: `%%text%%`.
///
/// The marker is exactly two percent signs. A lone `%` is ordinary text.
pub struct PercentComment;

impl PercentComment {
    pub const MARK: &'static str = "%%";
}
