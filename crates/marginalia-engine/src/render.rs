//! HTML output for annotated fragment runs.

use html_escape::encode_text;
use marginalia_config::Settings;

use crate::fragments::{AnnotateOptions, Fragment, annotate};

/// Renders fragments as HTML: text is escaped, markup and line breaks are
/// emitted as given.
pub fn render_html(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Text(text) => out.push_str(&encode_text(text)),
            Fragment::Open { raw, .. }
            | Fragment::Close { raw, .. }
            | Fragment::Void { raw }
            | Fragment::LineBreak { raw } => out.push_str(raw),
        }
    }
    out
}

/// Annotates and renders one plain text fragment. Line mode applies per
/// `\n`-separated line; paragraph mode needs a host paragraph and does not.
pub fn render_text(text: &str, settings: &Settings) -> String {
    let fragments = split_lines(text);
    render_html(&annotate(fragments, settings, &AnnotateOptions::default()).fragments)
}

fn split_lines(text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            fragments.push(Fragment::soft_break());
        }
        if !line.is_empty() {
            fragments.push(Fragment::text(line));
        }
    }
    fragments
}
