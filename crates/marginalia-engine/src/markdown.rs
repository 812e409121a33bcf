//! pulldown-cmark host adapter.
//!
//! Each maximal run of inline events becomes a fragment run: text, soft and
//! hard breaks, inline HTML classified into open/close/void, inline tags
//! rendered to their start and end markup, and code spans and images as
//! self-contained markup. Code block content passes through untouched. The
//! annotated run is turned back into events and
//! rendered with `pulldown_cmark::html::push_html`.
//!
//! Markdown backslash escapes for ASCII punctuation, such as `\%` or `\\`,
//! are resolved by the parser. Their buffer offsets are handed to the
//! reconciler as literal characters, so `\%%` is never a marker. Inline tags
//! keep their Markdown delimiters so a comment crossing `*a★b*★` leaves the
//! `*` in place instead of dropping it.

use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use marginalia_config::Settings;
use pulldown_cmark::{CowStr, Event, Parser, Tag, TagEnd, html};
use std::ops::Range;

use crate::fragments::{AnnotateOptions, Fragment, ParagraphAction, annotate};
use crate::scan::escape_run_before;

type Spanned<'a> = (Event<'a>, Range<usize>);

/// Host parser switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Pass raw HTML through. When off, inline HTML and HTML blocks are
    /// rendered as escaped text and can sit inside a comment.
    pub html: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self { html: true }
    }
}

/// Renders Markdown to HTML with annotations applied to every inline run.
pub fn render_markdown(source: &str, settings: &Settings) -> String {
    render_markdown_with(source, settings, &MarkdownOptions::default())
}

pub fn render_markdown_with(source: &str, settings: &Settings, markdown: &MarkdownOptions) -> String {
    let mut events: Vec<Spanned<'_>> = Parser::new(source).into_offset_iter().collect();
    if !markdown.html {
        events = html_as_text(events);
    }
    let mut out: Vec<Event<'_>> = Vec::with_capacity(events.len());

    let mut in_code_block = false;
    let mut i = 0;
    while i < events.len() {
        match &events[i].0 {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            _ => {}
        }
        if in_code_block || !is_inline(&events[i].0) {
            out.push(events[i].0.clone());
            i += 1;
            continue;
        }
        let start = i;
        while i < events.len() && is_inline(&events[i].0) {
            i += 1;
        }
        let in_paragraph = matches!(out.last(), Some(Event::Start(Tag::Paragraph)))
            && matches!(events.get(i), Some((Event::End(TagEnd::Paragraph), _)));
        let (fragments, literal) = to_fragments(source, &events[start..i]);
        let options = AnnotateOptions {
            paragraph: in_paragraph,
            literal,
            ..AnnotateOptions::default()
        };
        let annotated = annotate(fragments, settings, &options);

        match annotated.paragraph {
            ParagraphAction::Drop => {
                out.pop();
                i += 1;
                continue;
            }
            ParagraphAction::Class(class) => {
                out.pop();
                let class = encode_double_quoted_attribute(&class);
                out.push(Event::Html(format!("<p class=\"{class}\">").into()));
            }
            ParagraphAction::Keep => {}
        }
        out.extend(annotated.fragments.into_iter().map(to_event));
    }

    let mut rendered = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut rendered, out.into_iter());
    rendered
}

/// Turns raw HTML into text. An HTML block becomes a paragraph of its lines.
fn html_as_text(events: Vec<Spanned<'_>>) -> Vec<Spanned<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut block: Option<(String, Range<usize>)> = None;
    for (event, range) in events {
        match event {
            Event::Start(Tag::HtmlBlock) => block = Some((String::new(), range)),
            Event::Html(raw) if block.is_some() => {
                if let Some((text, _)) = block.as_mut() {
                    text.push_str(&raw);
                }
            }
            Event::End(TagEnd::HtmlBlock) => {
                let Some((text, range)) = block.take() else {
                    continue;
                };
                let at = range.start..range.start;
                out.push((Event::Start(Tag::Paragraph), range.clone()));
                for (k, line) in text.trim_end_matches('\n').split('\n').enumerate() {
                    if k > 0 {
                        out.push((Event::SoftBreak, at.clone()));
                    }
                    out.push((Event::Text(line.trim_start().to_string().into()), at.clone()));
                }
                out.push((Event::End(TagEnd::Paragraph), range));
            }
            Event::InlineHtml(raw) | Event::Html(raw) => out.push((Event::Text(raw), range)),
            event => out.push((event, range)),
        }
    }
    out
}

fn is_inline(event: &Event<'_>) -> bool {
    match event {
        Event::Text(_)
        | Event::Code(_)
        | Event::InlineHtml(_)
        | Event::InlineMath(_)
        | Event::FootnoteReference(_)
        | Event::SoftBreak
        | Event::HardBreak => true,
        Event::Start(tag) => matches!(
            tag,
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
        ),
        Event::End(end) => matches!(
            end,
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
        ),
        _ => false,
    }
}

fn render_events(events: &[Spanned<'_>]) -> String {
    let mut rendered = String::new();
    html::push_html(&mut rendered, events.iter().map(|(event, _)| event.clone()));
    rendered
}

/// Fragments of one inline run, with the buffer offsets of characters the
/// parser unescaped.
fn to_fragments(source: &str, events: &[Spanned<'_>]) -> (Vec<Fragment>, Vec<usize>) {
    let mut fragments: Vec<Fragment> = Vec::with_capacity(events.len());
    let mut literal = Vec::new();
    let mut buffer_len = 0;
    let mut j = 0;
    while j < events.len() {
        let (event, range) = &events[j];
        match event {
            Event::Text(text) => {
                literal.extend(
                    unescaped_offsets(source, range.clone(), text)
                        .into_iter()
                        .map(|offset| buffer_len + offset),
                );
                buffer_len += text.len();
                match fragments.last_mut() {
                    Some(Fragment::Text(last)) => last.push_str(text),
                    _ => fragments.push(Fragment::text(text.as_ref())),
                }
            }
            Event::SoftBreak => {
                buffer_len += 1;
                fragments.push(Fragment::soft_break());
            }
            Event::HardBreak => {
                buffer_len += 1;
                fragments.push(Fragment::LineBreak {
                    raw: render_events(&events[j..=j]),
                });
            }
            Event::InlineHtml(raw) => fragments.push(Fragment::html(raw)),
            Event::Start(Tag::Image { .. }) => {
                let end = image_end(events, j);
                fragments.push(Fragment::Void {
                    raw: render_events(&events[j..=end]),
                });
                j = end;
            }
            Event::Start(_) | Event::End(_) => {
                let tag = Fragment::html(&render_events(&events[j..=j]));
                let raw = source.get(range.clone()).unwrap_or_default();
                fragments.push(match delimiter(event, raw) {
                    Some(delimiter) => tag.with_source(delimiter),
                    None => tag,
                });
            }
            _ => fragments.push(Fragment::Void {
                raw: render_events(&events[j..=j]),
            }),
        }
        j += 1;
    }
    (fragments, literal)
}

/// Offsets into `text` of characters written as a backslash escape in
/// `source[range]`.
fn unescaped_offsets(source: &str, range: Range<usize>, text: &str) -> Vec<usize> {
    let raw = source.get(range.clone()).unwrap_or_default().as_bytes();
    let bytes = text.as_bytes();
    let mut offsets = Vec::new();

    // The parser starts an escaped character's text after its backslash.
    let escaped_first = escape_run_before(source, range.start) % 2 == 1
        && raw.first().is_some_and(u8::is_ascii_punctuation)
        && raw.first() == bytes.first();
    if escaped_first {
        offsets.push(0);
    }
    if raw == bytes {
        return offsets;
    }

    let (mut i, mut j) = (0, 0);
    while i < raw.len() && j < bytes.len() {
        if raw[i] == b'\\' && raw.get(i + 1).is_some_and(|&b| b.is_ascii_punctuation() && b == bytes[j]) {
            offsets.push(j);
            i += 2;
            j += 1;
        } else if raw[i] == b'&' {
            let Some((entity, decoded)) = entity_at(&raw[i..], text.get(j..).unwrap_or_default()) else {
                break;
            };
            i += entity;
            j += decoded;
        } else if raw[i] == bytes[j] {
            i += 1;
            j += 1;
        } else {
            break;
        }
    }
    offsets
}

/// Lengths of a character reference at the start of `raw` and of its
/// decoded form at the start of `text`.
fn entity_at(raw: &[u8], text: &str) -> Option<(usize, usize)> {
    let end = raw.iter().take(32).position(|&b| b == b';')?;
    let entity = std::str::from_utf8(&raw[..=end]).ok()?;
    let decoded = decode_html_entities(entity);
    text.starts_with(decoded.as_ref())
        .then(|| (entity.len(), decoded.len()))
}

/// The Markdown syntax a tag event was written with, such as `**` or `](url)`.
fn delimiter<'s>(event: &Event<'_>, raw: &'s str) -> Option<&'s str> {
    let head = |n: usize| raw.get(..n);
    let tail = |n: usize| raw.len().checked_sub(n).and_then(|k| raw.get(k..));
    let tildes = raw.len() - raw.trim_start_matches('~').len();
    match event {
        Event::Start(Tag::Emphasis) => head(1),
        Event::End(TagEnd::Emphasis) => tail(1),
        Event::Start(Tag::Strong) => head(2),
        Event::End(TagEnd::Strong) => tail(2),
        Event::Start(Tag::Strikethrough) => head(tildes),
        Event::End(TagEnd::Strikethrough) => tail(tildes),
        Event::Start(Tag::Link { .. }) if raw.starts_with(['<', '[']) => head(1),
        Event::End(TagEnd::Link) if raw.starts_with('<') => tail(1),
        Event::End(TagEnd::Link) => {
            let close = raw.rfind("](").max(raw.rfind("]["));
            match close {
                Some(at) => raw.get(at..),
                None => raw.ends_with(']').then(|| tail(1)).flatten(),
            }
        }
        _ => None,
    }
}

/// Index of the `End(Image)` closing the image started at `start`.
fn image_end(events: &[Spanned<'_>], start: usize) -> usize {
    let mut depth = 0usize;
    for (k, (event, _)) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(Tag::Image { .. }) => depth += 1,
            Event::End(TagEnd::Image) => {
                depth -= 1;
                if depth == 0 {
                    return k;
                }
            }
            _ => {}
        }
    }
    events.len() - 1
}

fn to_event<'a>(fragment: Fragment) -> Event<'a> {
    match fragment {
        Fragment::Text(text) => Event::Text(CowStr::from(text)),
        Fragment::LineBreak { raw } if raw == "\n" => Event::SoftBreak,
        Fragment::LineBreak { .. } => Event::HardBreak,
        Fragment::Open { raw, .. } | Fragment::Close { raw, .. } | Fragment::Void { raw } => {
            Event::InlineHtml(CowStr::from(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_config::{ClassOption, Options};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn settings(configure: impl FnOnce(&mut Options)) -> Settings {
        let mut options = Options::default();
        configure(&mut options);
        options.normalize()
    }

    fn inline_run(source: &str) -> (Vec<Fragment>, Vec<usize>) {
        let events: Vec<Spanned<'_>> = Parser::new(source).into_offset_iter().collect();
        to_fragments(source, &events[1..events.len() - 1])
    }

    #[test]
    fn inline_tags_become_markup_fragments() {
        let (fragments, literal) = inline_run("a *b* `c` <br>");
        assert!(literal.is_empty());
        assert_eq!(
            fragments,
            vec![
                Fragment::text("a "),
                Fragment::html("<em>").with_source("*"),
                Fragment::text("b"),
                Fragment::html("</em>").with_source("*"),
                Fragment::text(" "),
                Fragment::Void {
                    raw: "<code>c</code>".to_string()
                },
                Fragment::text(" "),
                Fragment::Void {
                    raw: "<br>".to_string()
                },
            ]
        );
    }

    #[test]
    fn image_is_one_void_fragment() {
        let (fragments, _) = inline_run("![alt *x*](p.png)");
        assert_eq!(fragments.len(), 1);
        assert!(matches!(&fragments[0], Fragment::Void { raw } if raw.starts_with("<img")));
    }

    #[test]
    fn escaped_punctuation_offsets_are_literal() {
        let (fragments, literal) = inline_run(r"a\%%b \\★ &amp;\%");
        assert_eq!(fragments, vec![Fragment::text(r"a%%b \★ &%")]);
        assert_eq!(literal, vec![1, 5, 11]);
    }

    #[rstest]
    #[case("**強調**", "**", "**")]
    #[case("_a_", "_", "_")]
    #[case("[link](https://example.com)", "[", "](https://example.com)")]
    #[case("[link][ref]\n\n[ref]: /x", "[", "][ref]")]
    #[case("<https://example.com>", "<", ">")]
    fn tags_carry_their_delimiters(#[case] source: &str, #[case] open: &str, #[case] close: &str) {
        let (fragments, _) = inline_run(source);
        let tags: Vec<Option<&str>> = fragments
            .iter()
            .filter(|fragment| fragment.name().is_some())
            .map(Fragment::source)
            .collect();
        assert_eq!(tags, vec![Some(open), Some(close)]);
    }

    #[test]
    fn html_off_renders_markup_as_text() {
        let s = settings(|o| o.star_comment = true);
        let markdown = MarkdownOptions { html: false };
        assert_eq!(
            render_markdown_with("<div>\n★x★</div>\n", &s, &markdown),
            "<p>&lt;div&gt;\n<span class=\"star-comment\">★x★</span>&lt;/div&gt;</p>\n"
        );
        assert_eq!(
            render_markdown_with("a <i>b</i>", &Settings::default(), &markdown),
            "<p>a &lt;i&gt;b&lt;/i&gt;</p>\n"
        );
    }

    #[test]
    fn nothing_enabled_matches_plain_rendering() {
        let source = "# ★Title★\n\nText with %%memo%% and 漢字《かんじ》.\n";
        let mut plain = String::new();
        html::push_html(&mut plain, Parser::new(source));
        assert_eq!(render_markdown(source, &Settings::default()), plain);
    }

    #[test]
    fn paragraph_class_goes_on_paragraph() {
        let s = settings(|o| {
            o.star_comment = true;
            o.star_comment_paragraph = true;
            o.star_comment_paragraph_class = ClassOption::Name("sold-out".to_string());
        });
        assert_eq!(
            render_markdown("★本日は売り切れ次第終了です。", &s),
            "<p class=\"sold-out\">★本日は売り切れ次第終了です。</p>\n"
        );
    }
}
