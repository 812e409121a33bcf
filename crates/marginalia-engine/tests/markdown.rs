use marginalia_config::{ClassOption, Options, Settings};
use marginalia_engine::{MarkdownOptions, render_markdown, render_markdown_with};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn settings(configure: impl FnOnce(&mut Options)) -> Settings {
    let mut options = Options::default();
    configure(&mut options);
    options.normalize()
}

fn inline_all() -> Settings {
    settings(|o| {
        o.ruby = true;
        o.star_comment = true;
        o.percent_comment = true;
    })
}

#[rstest]
#[case("前★星★後", "<p>前<span class=\"star-comment\">★星★</span>後</p>\n")]
#[case(r"\★x★", "<p>★x★</p>\n")]
#[case(
    "★あああ<span>aaaa</span>あああ★",
    "<p><span class=\"star-comment\">★あああ<span>aaaa</span>あああ★</span></p>\n"
)]
#[case(
    "前<span title=\"★x★ %%y%% 漢字《かんじ》\">漢字《ほんぶん》</span>後",
    "<p>前<span title=\"★x★ %%y%% 漢字《かんじ》\"><ruby>漢字<rp>《</rp><rt>ほんぶん</rt><rp>》</rp></ruby></span>後</p>\n"
)]
#[case(
    "a ★b *c* d★ e",
    "<p>a <span class=\"star-comment\">★b <em>c</em> d★</span> e</p>\n"
)]
#[case(
    "a *b ★c* d★ e",
    "<p>a *b <span class=\"star-comment\">★c* d★</span> e</p>\n"
)]
#[case(
    "**前★A**B★後",
    "<p>**前<span class=\"star-comment\">★A**B★</span>後</p>\n"
)]
#[case(
    "**前%%A**B%%後",
    "<p>**前<span class=\"percent-comment\">%%A**B%%</span>後</p>\n"
)]
#[case(r"\%%x%%", "<p>%%x%%</p>\n")]
#[case(r"%%a\%%b%%", "<p><span class=\"percent-comment\">%%a%%b%%</span></p>\n")]
#[case(r"\\★x★", "<p>\\<span class=\"star-comment\">★x★</span></p>\n")]
#[case(
    "`★code★` ★text★",
    "<p><code>★code★</code> <span class=\"star-comment\">★text★</span></p>\n"
)]
#[case(
    "★one\ntwo★",
    "<p><span class=\"star-comment\">★one\ntwo★</span></p>\n"
)]
fn inline_annotations(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(render_markdown(source, &inline_all()), expected);
}

#[test]
fn inline_delete() {
    let s = settings(|o| {
        o.star_comment = true;
        o.star_comment_delete = true;
    });
    assert_eq!(render_markdown("前★星★後", &s), "<p>前後</p>\n");
    assert_eq!(
        render_markdown("a ★b *c* d★ e", &s),
        "<p>a  e</p>\n"
    );
}

#[test]
fn escaped_percent_starts_no_line_comment() {
    let s = settings(|o| {
        o.percent_comment = true;
        o.percent_comment_line = true;
    });
    assert_eq!(render_markdown(r"\%%not a comment", &s), "<p>%%not a comment</p>\n");
}

#[test]
fn html_disabled_keeps_tags_inside_comment() {
    let markdown = MarkdownOptions { html: false };
    assert_eq!(
        render_markdown_with("前★<b>x</b>★後", &inline_all(), &markdown),
        "<p>前<span class=\"star-comment\">★&lt;b&gt;x&lt;/b&gt;★</span>後</p>\n"
    );
    assert_eq!(
        render_markdown("前★<b>x</b>★後", &inline_all()),
        "<p>前<span class=\"star-comment\">★<b>x</b>★</span>後</p>\n"
    );
}

#[test]
fn percent_line_mode() {
    let s = settings(|o| {
        o.percent_comment = true;
        o.percent_comment_line = true;
    });
    assert_eq!(
        render_markdown("%%行コメント\n通常", &s),
        "<p><span class=\"percent-comment\">%%行コメント</span>\n通常</p>\n"
    );
}

#[test]
fn percent_line_delete_drops_comment_only_paragraph() {
    let s = settings(|o| {
        o.percent_comment = true;
        o.percent_comment_line = true;
        o.percent_comment_delete = true;
    });
    assert_eq!(
        render_markdown("%%行コメント\n通常", &s),
        "<p>通常</p>\n"
    );
    assert_eq!(
        render_markdown("%%a\n%%b\n\n本文", &s),
        "<p>本文</p>\n"
    );
}

#[rstest]
#[case(ClassOption::Flag(false), "<p><span class=\"star-comment\">★本日は売り切れ次第終了です。</span></p>\n")]
#[case(ClassOption::Flag(true), "<p class=\"star-comment\">★本日は売り切れ次第終了です。</p>\n")]
#[case(ClassOption::Name("  ".to_string()), "<p class=\"star-comment\">★本日は売り切れ次第終了です。</p>\n")]
fn star_paragraph_mode(#[case] class: ClassOption, #[case] expected: &str) {
    let s = settings(|o| {
        o.star_comment = true;
        o.star_comment_paragraph = true;
        o.star_comment_paragraph_class = class;
    });
    assert_eq!(render_markdown("★本日は売り切れ次第終了です。", &s), expected);
}

#[test]
fn star_paragraph_delete_drops_block() {
    let s = settings(|o| {
        o.star_comment = true;
        o.star_comment_paragraph = true;
        o.star_comment_delete = true;
    });
    assert_eq!(
        render_markdown("前文\n\n★段落コメント\n続き\n\n後文", &s),
        "<p>前文</p>\n<p>後文</p>\n"
    );
}

#[test]
fn custom_class_is_attribute_escaped() {
    let s = settings(|o| {
        o.percent_comment = true;
        o.percent_class = Some("x\" onclick=\"a&b".to_string());
    });
    assert_eq!(
        render_markdown("%%memo%%", &s),
        "<p><span class=\"x&quot; onclick=&quot;a&amp;b\">%%memo%%</span></p>\n"
    );
}

#[test]
fn code_blocks_are_not_annotated() {
    let source = "```\n★not a comment★\n```\n";
    assert_eq!(
        render_markdown(source, &inline_all()),
        "<pre><code>★not a comment★\n</code></pre>\n"
    );
}

#[test]
fn headings_and_lists_are_annotated() {
    assert_eq!(
        render_markdown("# 見出し★memo★\n\n- 項目%%memo%%\n", &inline_all()),
        concat!(
            "<h1>見出し<span class=\"star-comment\">★memo★</span></h1>\n",
            "<ul>\n",
            "<li>項目<span class=\"percent-comment\">%%memo%%</span></li>\n",
            "</ul>\n",
        )
    );
}
