use crate::{DEFAULT_PERCENT_CLASS, DEFAULT_STAR_CLASS, Options};

/// The two paired comment kinds. Ruby glosses have no scope or class and
/// are controlled by a single flag on [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    Star,
    Percent,
}

impl CommentKind {
    /// Scan priority order: on a tie at the same offset, star wins.
    pub const ALL: [CommentKind; 2] = [CommentKind::Star, CommentKind::Percent];

    pub fn default_class(self) -> &'static str {
        match self {
            CommentKind::Star => DEFAULT_STAR_CLASS,
            CommentKind::Percent => DEFAULT_PERCENT_CLASS,
        }
    }
}

/// Marking scope of an enabled comment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Paired markers inside a line.
    Inline,
    /// A line starting with a marker is a comment up to its end.
    Line,
    /// A block whose first line starts with a marker is a comment as a whole.
    Paragraph,
}

/// Normalized per-kind settings. Built only by [`Options::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSettings {
    enabled: bool,
    delete: bool,
    scope: Scope,
    class: String,
    paragraph_class: Option<String>,
}

impl CommentSettings {
    pub(crate) fn new(
        enabled: bool,
        delete: bool,
        scope: Scope,
        class: String,
        paragraph_class: Option<String>,
    ) -> Self {
        Self {
            enabled,
            delete,
            scope,
            class,
            paragraph_class,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn delete(&self) -> bool {
        self.delete
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_inline(&self) -> bool {
        self.enabled && self.scope == Scope::Inline
    }

    pub fn is_line(&self) -> bool {
        self.enabled && self.scope == Scope::Line
    }

    pub fn is_paragraph(&self) -> bool {
        self.enabled && self.scope == Scope::Paragraph
    }

    /// Container class, already trimmed and never empty.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Class handed to the host paragraph instead of an inner container.
    /// Only present in paragraph mode.
    pub fn paragraph_class(&self) -> Option<&str> {
        self.paragraph_class.as_deref()
    }
}

/// Bitmask over the settings that change scan results. Part of every
/// analyzer cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint(u16);

impl Fingerprint {
    pub const RUBY: u16 = 1;
    pub const STAR: u16 = 2;
    pub const STAR_DELETE: u16 = 4;
    pub const STAR_PARAGRAPH: u16 = 8;
    pub const STAR_LINE: u16 = 16;
    pub const PERCENT: u16 = 32;
    pub const PERCENT_DELETE: u16 = 64;
    pub const PERCENT_PARAGRAPH: u16 = 128;
    pub const PERCENT_LINE: u16 = 256;
    pub const STAR_PARAGRAPH_CLASS: u16 = 512;
    pub const PERCENT_PARAGRAPH_CLASS: u16 = 1024;

    #[must_use]
    pub fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    fn compute(ruby: bool, star: &CommentSettings, percent: &CommentSettings) -> Self {
        let mut bits = 0;
        if ruby {
            bits |= Self::RUBY;
        }
        bits |= Self::comment_bits(
            star,
            [
                Self::STAR,
                Self::STAR_DELETE,
                Self::STAR_PARAGRAPH,
                Self::STAR_LINE,
                Self::STAR_PARAGRAPH_CLASS,
            ],
        );
        bits |= Self::comment_bits(
            percent,
            [
                Self::PERCENT,
                Self::PERCENT_DELETE,
                Self::PERCENT_PARAGRAPH,
                Self::PERCENT_LINE,
                Self::PERCENT_PARAGRAPH_CLASS,
            ],
        );
        Fingerprint(bits)
    }

    fn comment_bits(settings: &CommentSettings, flags: [u16; 5]) -> u16 {
        let [enabled, delete, paragraph, line, paragraph_class] = flags;
        let mut bits = 0;
        if settings.enabled {
            bits |= enabled;
        }
        if settings.delete {
            bits |= delete;
        }
        if settings.is_paragraph() {
            bits |= paragraph;
        }
        if settings.is_line() {
            bits |= line;
        }
        if settings.paragraph_class.is_some() {
            bits |= paragraph_class;
        }
        bits
    }
}

/// Immutable, normalized configuration threaded through every engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    ruby: bool,
    star: CommentSettings,
    percent: CommentSettings,
    fingerprint: Fingerprint,
}

impl Settings {
    pub(crate) fn new(ruby: bool, star: CommentSettings, percent: CommentSettings) -> Self {
        let fingerprint = Fingerprint::compute(ruby, &star, &percent);
        Self {
            ruby,
            star,
            percent,
            fingerprint,
        }
    }

    pub fn ruby(&self) -> bool {
        self.ruby
    }

    pub fn comment(&self, kind: CommentKind) -> &CommentSettings {
        match kind {
            CommentKind::Star => &self.star,
            CommentKind::Percent => &self.percent,
        }
    }

    pub fn star(&self) -> &CommentSettings {
        &self.star
    }

    pub fn percent(&self) -> &CommentSettings {
        &self.percent
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// True when any annotation kind is switched on.
    pub fn any_enabled(&self) -> bool {
        self.ruby || self.star.enabled || self.percent.enabled
    }
}

impl Default for Settings {
    fn default() -> Self {
        Options::default().normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassOption;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fingerprint_bits() {
        let options = Options {
            ruby: true,
            star_comment: true,
            star_comment_delete: true,
            star_comment_paragraph: true,
            star_comment_paragraph_class: ClassOption::Flag(true),
            percent_comment: true,
            percent_comment_line: true,
            percent_comment_paragraph: true,
            ..Options::default()
        };
        let fingerprint = options.normalize().fingerprint();

        assert_eq!(
            fingerprint.bits(),
            Fingerprint::RUBY
                | Fingerprint::STAR
                | Fingerprint::STAR_DELETE
                | Fingerprint::STAR_PARAGRAPH
                | Fingerprint::STAR_PARAGRAPH_CLASS
                | Fingerprint::PERCENT
                | Fingerprint::PERCENT_LINE
        );
        assert!(!fingerprint.contains(Fingerprint::PERCENT_PARAGRAPH));
    }

    #[test]
    fn test_fingerprint_ignores_class_names() {
        let plain = Options {
            star_comment: true,
            ..Options::default()
        };
        let custom = Options {
            star_class: Some("note".to_string()),
            ..plain.clone()
        };
        assert_eq!(plain.normalize().fingerprint(), custom.normalize().fingerprint());
    }

    #[test]
    fn test_default_classes() {
        let settings = Settings::default();
        assert_eq!(settings.star().class(), "star-comment");
        assert_eq!(settings.percent().class(), "percent-comment");
        assert_eq!(settings.comment(CommentKind::Star), settings.star());
    }

    #[test]
    fn test_scope_predicates_need_enabled_kind() {
        let settings = Options {
            percent_comment: true,
            ..Options::default()
        }
        .normalize();

        assert!(settings.percent().is_inline());
        assert!(!settings.star().is_inline());
        assert_eq!(settings.star().scope(), Scope::Inline);
    }
}
