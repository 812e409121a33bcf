/// Ruby gloss: `base《reading》`, optionally wrapped in `<ruby>…</ruby>`.
pub struct RubyGloss;

impl RubyGloss {
    pub const OPEN: char = '《';
    pub const CLOSE: char = '》';
    pub const TAG_OPEN: &'static str = "<ruby>";
    pub const TAG_CLOSE: &'static str = "</ruby>";

    /// Renders the gloss body: base, bracket fallbacks and the reading.
    /// Both parts must already be HTML-escaped.
    pub fn body_html(base: &str, reading: &str) -> String {
        format!(
            "{base}<rp>{}</rp><rt>{reading}</rt><rp>{}</rp>",
            Self::OPEN,
            Self::CLOSE
        )
    }

    /// Renders a complete `<ruby>` element.
    pub fn html(base: &str, reading: &str) -> String {
        format!(
            "{}{}{}",
            Self::TAG_OPEN,
            Self::body_html(base, reading),
            Self::TAG_CLOSE
        )
    }
}
