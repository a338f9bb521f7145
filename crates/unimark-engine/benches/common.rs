// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with *some* **content** and a [link](https://example.com).\n\n- Bullet point\n  - Nested item\n- [x] Done item\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n> Quoted `code`\n\n";
    base.repeat(size)
}

/// Content heavy on raw HTML, so the reconcile pass has work to do.
#[allow(dead_code)]
pub fn generate_html_content(size: usize) -> String {
    let mut content = String::new();
    for i in 0..size {
        content.push_str(&format!("Para {i} with <span class=\"x\">inline *html*</span> and <br> break.\n\n"));
        content.push_str("<div>\n\nBlock **body**.\n\n</div>\n\n");
    }
    content
}

/// Every paragraph leaves one tag open, so each opening tag has to look for
/// a closing tag that never comes.
#[allow(dead_code)]
pub fn generate_unclosed_html_content(size: usize) -> String {
    let mut content = String::new();
    for i in 0..size {
        content.push_str(&format!("p{i} <span>x</span> and <i>unclosed\n\n"));
    }
    content
}

#[allow(dead_code)]
pub fn generate_table_content(rows: usize) -> String {
    let mut content = String::from("| Name | Value | Note |\n|:-----|------:|:----:|\n");
    for i in 0..rows {
        content.push_str(&format!("| row {i} | {} | *n* ~~x~~ |\n", i * 7));
    }
    content
}
