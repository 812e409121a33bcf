// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use marginalia_config::{Options, Settings};

#[allow(dead_code)]
pub fn generate_lines(paragraphs: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(paragraphs * 5);
    for p in 0..paragraphs {
        lines.push(format!("★段落{p}のコメントです。"));
        lines.push(format!("本文です。漢字《かんじ》と%%memo {p}%%を含みます。"));
        lines.push(r"エスケープ \★not★ と \\★yes★ の行".to_string());
        lines.push("%%line note".to_string());
        lines.push(String::new());
    }
    lines
}

#[allow(dead_code)]
pub fn generate_markdown(paragraphs: usize) -> String {
    let mut content = String::new();
    for p in 0..paragraphs {
        content.push_str(&format!("## Section {p}\n\n"));
        content.push_str("前★星*強調*★後 漢字《かんじ》 and %%memo%% text.\n");
        content.push_str("a *b ★c* d★ e <span>x</span>\n\n");
        content.push_str("- 項目★note★\n- `★code★`\n\n");
    }
    content
}

#[allow(dead_code)]
pub fn all_inline() -> Settings {
    Options {
        ruby: true,
        star_comment: true,
        percent_comment: true,
        ..Options::default()
    }
    .normalize()
}

#[allow(dead_code)]
pub fn paragraph_and_line() -> Settings {
    Options {
        ruby: true,
        star_comment: true,
        star_comment_paragraph: true,
        percent_comment: true,
        percent_comment_line: true,
        ..Options::default()
    }
    .normalize()
}
