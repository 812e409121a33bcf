//! # marginalia-config
//!
//! The user-facing option surface for marginalia and its normalization into
//! immutable [`Settings`].
//!
//! Options arrive either as a TOML table (`Options::from_toml_str`) or one
//! named flag at a time (`Options::set`). Both paths reject unknown keys
//! eagerly so a typo never silently disables an annotation kind halfway
//! through a document. Once validated, [`Options::normalize`] resolves the
//! precedence rules (line mode beats paragraph mode, delete needs the kind to
//! be enabled, class fallbacks) and computes the [`Fingerprint`] used as part
//! of the analyzer's cache keys.

mod settings;

pub use settings::{CommentKind, CommentSettings, Fingerprint, Scope, Settings};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STAR_CLASS: &str = "star-comment";
pub const DEFAULT_PERCENT_CLASS: &str = "percent-comment";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse options: {source}")]
    Parse { source: toml::de::Error },

    #[error("Unknown option `{key}`")]
    UnknownOption { key: String },

    #[error("Option `{key}` expects {expected}")]
    InvalidValue { key: String, expected: &'static str },
}

/// Class option for paragraph mode: `true` uses the kind's class, `false`
/// disables the paragraph class, a string names a custom class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassOption {
    Flag(bool),
    Name(String),
}

impl Default for ClassOption {
    fn default() -> Self {
        ClassOption::Flag(false)
    }
}

/// A single value for [`Options::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub ruby: bool,

    #[serde(alias = "starComment")]
    pub star_comment: bool,
    #[serde(alias = "starCommentDelete")]
    pub star_comment_delete: bool,
    #[serde(alias = "starCommentParagraph")]
    pub star_comment_paragraph: bool,
    #[serde(alias = "starCommentLine")]
    pub star_comment_line: bool,
    #[serde(alias = "starCommentParagraphClass")]
    pub star_comment_paragraph_class: ClassOption,
    #[serde(alias = "starClass", skip_serializing_if = "Option::is_none")]
    pub star_class: Option<String>,

    #[serde(alias = "percentComment")]
    pub percent_comment: bool,
    #[serde(alias = "percentCommentDelete")]
    pub percent_comment_delete: bool,
    #[serde(alias = "percentCommentParagraph")]
    pub percent_comment_paragraph: bool,
    #[serde(alias = "percentCommentLine")]
    pub percent_comment_line: bool,
    #[serde(alias = "percentCommentParagraphClass")]
    pub percent_comment_paragraph_class: ClassOption,
    #[serde(alias = "percentClass", skip_serializing_if = "Option::is_none")]
    pub percent_class: Option<String>,
}

impl Options {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { source })
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Sets one named option. Keys may be given in `snake_case` or in the
    /// `camelCase` spelling.
    pub fn set(&mut self, key: &str, value: impl Into<OptionValue>) -> Result<(), ConfigError> {
        let value = value.into();
        let canonical = canonical_key(key);
        match canonical.as_str() {
            "ruby" => self.ruby = expect_bool(key, value)?,
            "star_comment" => self.star_comment = expect_bool(key, value)?,
            "star_comment_delete" => self.star_comment_delete = expect_bool(key, value)?,
            "star_comment_paragraph" => self.star_comment_paragraph = expect_bool(key, value)?,
            "star_comment_line" => self.star_comment_line = expect_bool(key, value)?,
            "star_comment_paragraph_class" => {
                self.star_comment_paragraph_class = class_option(value)
            }
            "star_class" => self.star_class = Some(expect_text(key, value)?),
            "percent_comment" => self.percent_comment = expect_bool(key, value)?,
            "percent_comment_delete" => self.percent_comment_delete = expect_bool(key, value)?,
            "percent_comment_paragraph" => {
                self.percent_comment_paragraph = expect_bool(key, value)?
            }
            "percent_comment_line" => self.percent_comment_line = expect_bool(key, value)?,
            "percent_comment_paragraph_class" => {
                self.percent_comment_paragraph_class = class_option(value)
            }
            "percent_class" => self.percent_class = Some(expect_text(key, value)?),
            _ => {
                return Err(ConfigError::UnknownOption {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolves option precedence into immutable [`Settings`].
    pub fn normalize(&self) -> Settings {
        let star = normalize_comment(
            CommentKind::Star,
            self.star_comment,
            self.star_comment_delete,
            self.star_comment_paragraph,
            self.star_comment_line,
            &self.star_comment_paragraph_class,
            self.star_class.as_deref(),
        );
        let percent = normalize_comment(
            CommentKind::Percent,
            self.percent_comment,
            self.percent_comment_delete,
            self.percent_comment_paragraph,
            self.percent_comment_line,
            &self.percent_comment_paragraph_class,
            self.percent_class.as_deref(),
        );
        Settings::new(self.ruby, star, percent)
    }
}

fn normalize_comment(
    kind: CommentKind,
    enabled: bool,
    delete: bool,
    paragraph: bool,
    line: bool,
    paragraph_class: &ClassOption,
    class: Option<&str>,
) -> CommentSettings {
    let class = normalize_class(class, kind.default_class());
    let line = enabled && line;
    let paragraph = enabled && paragraph && !line;
    let scope = if line {
        Scope::Line
    } else if paragraph {
        Scope::Paragraph
    } else {
        Scope::Inline
    };
    let paragraph_class = if paragraph {
        normalize_paragraph_class(paragraph_class, &class)
    } else {
        None
    };
    CommentSettings::new(enabled, enabled && delete, scope, class, paragraph_class)
}

fn normalize_class(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => fallback.to_string(),
    }
}

fn normalize_paragraph_class(value: &ClassOption, fallback: &str) -> Option<String> {
    match value {
        ClassOption::Flag(false) => None,
        ClassOption::Flag(true) => Some(fallback.to_string()),
        ClassOption::Name(name) => Some(normalize_class(Some(name), fallback)),
    }
}

fn class_option(value: OptionValue) -> ClassOption {
    match value {
        OptionValue::Bool(flag) => ClassOption::Flag(flag),
        OptionValue::Text(name) => ClassOption::Name(name),
    }
}

fn expect_bool(key: &str, value: OptionValue) -> Result<bool, ConfigError> {
    match value {
        OptionValue::Bool(flag) => Ok(flag),
        OptionValue::Text(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a boolean",
        }),
    }
}

fn expect_text(key: &str, value: OptionValue) -> Result<String, ConfigError> {
    match value {
        OptionValue::Text(text) => Ok(text),
        OptionValue::Bool(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}

fn canonical_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
