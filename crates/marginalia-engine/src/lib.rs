//! # marginalia-engine
//!
//! Recognition and rendering of three inline annotation kinds in text that
//! flows through a document pipeline:
//!
//! - star comments `★…★`
//! - percent comments `%%…%%`
//! - ruby glosses `base《reading》`, optionally wrapped in `<ruby>…</ruby>`
//!
//! ## Modules
//!
//! - **`kinds`**: delimiter-owning types (`StarComment`, `PercentComment`, `RubyGloss`)
//! - **`scan`**: escape runs, marker pairing, ruby scanning, range merge
//! - **`classify`**: line and paragraph mode classification
//! - **`analyzer`**: incremental per-line analysis with an LRU cache
//! - **`fragments`**: cross-fragment reconciliation over host fragment runs
//! - **`render`**: HTML output
//! - **`markdown`**: pulldown-cmark host adapter
//!
//! All offsets are UTF-8 byte offsets; [`Span::to_chars`] converts.
//!
//! ```
//! use marginalia_config::Options;
//! use marginalia_engine::render_text;
//!
//! let settings = Options { star_comment: true, ..Options::default() }.normalize();
//! assert_eq!(
//!     render_text("A★B★C", &settings),
//!     r#"A<span class="star-comment">★B★</span>C"#
//! );
//! ```

pub mod analyzer;
pub mod classify;
pub mod fragments;
pub mod kinds;
pub mod markdown;
pub mod render;
pub mod scan;
pub mod span;

pub use analyzer::{
    Analysis, AnalyzeOptions, AnalyzeStats, AnalyzerState, FullAnalyzeThreshold, LineRecord,
    LineScan, analyze_all, analyze_window, should_full_analyze,
};
pub use classify::IgnoredLines;
pub use fragments::{AnnotateOptions, Annotated, Fragment, ParagraphAction, annotate};
pub use markdown::{MarkdownOptions, render_markdown, render_markdown_with};
pub use render::{render_html, render_text};
pub use scan::{AnnotationKind, AnnotationRange, scan_inline_ranges};
pub use span::Span;

pub use marginalia_config::{CommentKind, Fingerprint, Options, Settings};
