/// The escape character. An odd run of it right before a marker makes the
/// marker literal.
pub struct Escape;

impl Escape {
    pub const BACKSLASH: u8 = b'\\';
}
