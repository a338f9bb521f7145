//! Serializer adapter: [`ExternalNode`] tree back to markdown text.
//!
//! Output is normalized rather than byte-faithful (`*` for emphasis, `-` for
//! bullets, fenced code). Re-parsing it yields the same node kinds and child
//! structure, which is the round-trip guarantee the engine makes.

use super::{ExternalNode, NodeKind};

/// Renders a `root` (or any block container) to markdown.
pub fn serialize(root: &ExternalNode) -> String {
    let lines = if root.kind == NodeKind::Root {
        blocks(root.children())
    } else {
        block(root)
    };
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn blocks(nodes: &[ExternalNode]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.extend(block(node));
    }
    lines
}

fn block(node: &ExternalNode) -> Vec<String> {
    match node.kind {
        NodeKind::Paragraph => split_lines(&inline(node.children())),
        NodeKind::Heading => {
            let depth = node.data_u64("depth").unwrap_or(1).clamp(1, 6) as usize;
            vec![format!("{} {}", "#".repeat(depth), inline(node.children()))]
        }
        NodeKind::ThematicBreak => vec!["---".to_string()],
        NodeKind::Code => code_block(node),
        NodeKind::Html => split_lines(node.value.as_deref().unwrap_or("")),
        NodeKind::Blockquote => blocks(node.children())
            .into_iter()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect(),
        NodeKind::List => list(node),
        NodeKind::Table => table(node),
        _ => match &node.value {
            Some(value) => split_lines(value),
            None if node.children().iter().all(is_phrasing) => split_lines(&inline(node.children())),
            None => blocks(node.children()),
        },
    }
}

fn code_block(node: &ExternalNode) -> Vec<String> {
    let value = node.value.as_deref().unwrap_or("");
    let fence = "`".repeat(longest_run(value, '`').max(2) + 1);
    let mut info = node.data_str("lang").unwrap_or("").to_string();
    if let Some(meta) = node.data_str("meta") {
        info.push(' ');
        info.push_str(meta);
    }
    let mut lines = vec![format!("{fence}{info}")];
    if !value.is_empty() {
        lines.extend(split_lines(value));
    }
    lines.push(fence);
    lines
}

fn list(node: &ExternalNode) -> Vec<String> {
    let ordered = node.data_bool("ordered").unwrap_or(false);
    let start = node.data_u64("start").unwrap_or(1);
    let mut lines = Vec::new();
    for (i, item) in node.children().iter().enumerate() {
        let marker = if ordered {
            format!("{}.", start + i as u64)
        } else {
            "-".to_string()
        };
        let indent = " ".repeat(marker.len() + 1);
        let mut body = blocks(item.children());
        if let Some(checked) = item.data_bool("checked") {
            let box_ = if checked { "[x] " } else { "[ ] " };
            match body.first_mut() {
                Some(first) => first.insert_str(0, box_),
                None => body.push(box_.trim_end().to_string()),
            }
        }
        if body.is_empty() {
            lines.push(marker);
            continue;
        }
        for (j, line) in body.into_iter().enumerate() {
            if j == 0 {
                lines.push(format!("{marker} {line}"));
            } else if line.is_empty() {
                lines.push(line);
            } else {
                lines.push(format!("{indent}{line}"));
            }
        }
    }
    lines
}

fn table(node: &ExternalNode) -> Vec<String> {
    let mut lines = Vec::new();
    let aligns: Vec<Option<String>> = node
        .data
        .get("align")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    for (i, row) in node.children().iter().enumerate() {
        let cells: Vec<String> = row
            .children()
            .iter()
            .map(|cell| inline(cell.children()).replace('\n', " "))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            let delimiters: Vec<&str> = (0..cells.len())
                .map(|c| match aligns.get(c).and_then(|a| a.as_deref()) {
                    Some("left") => ":--",
                    Some("right") => "--:",
                    Some("center") => ":-:",
                    _ => "---",
                })
                .collect();
            lines.push(format!("| {} |", delimiters.join(" | ")));
        }
    }
    lines
}

fn inline(nodes: &[ExternalNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node.kind {
            NodeKind::Text => out.push_str(&escape(node.value.as_deref().unwrap_or(""))),
            NodeKind::Emphasis => wrap(&mut out, "*", &inline(node.children())),
            NodeKind::Strong => wrap(&mut out, "**", &inline(node.children())),
            NodeKind::Delete => wrap(&mut out, "~~", &inline(node.children())),
            NodeKind::InlineCode => out.push_str(&code_span(node.value.as_deref().unwrap_or(""))),
            NodeKind::Break => out.push_str("\\\n"),
            NodeKind::Html => out.push_str(node.value.as_deref().unwrap_or("")),
            NodeKind::Link => {
                out.push('[');
                out.push_str(&inline(node.children()));
                out.push_str("](");
                out.push_str(node.data_str("url").unwrap_or(""));
                push_title(&mut out, node);
                out.push(')');
            }
            NodeKind::Image => {
                out.push_str("![");
                out.push_str(&escape(node.data_str("alt").unwrap_or("")));
                out.push_str("](");
                out.push_str(node.data_str("url").unwrap_or(""));
                push_title(&mut out, node);
                out.push(')');
            }
            _ => match &node.value {
                Some(value) => out.push_str(value),
                None => out.push_str(&inline(node.children())),
            },
        }
    }
    out
}

fn wrap(out: &mut String, delimiter: &str, inner: &str) {
    out.push_str(delimiter);
    out.push_str(inner);
    out.push_str(delimiter);
}

fn push_title(out: &mut String, node: &ExternalNode) {
    if let Some(title) = node.data_str("title") {
        out.push_str(" \"");
        out.push_str(&title.replace('"', "\\\""));
        out.push('"');
    }
}

fn code_span(value: &str) -> String {
    let fence = "`".repeat(longest_run(value, '`') + 1);
    if value.starts_with('`') || value.ends_with('`') {
        format!("{fence} {value} {fence}")
    } else {
        format!("{fence}{value}{fence}")
    }
}

fn is_phrasing(node: &ExternalNode) -> bool {
    matches!(
        node.kind,
        NodeKind::Text
            | NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::Delete
            | NodeKind::InlineCode
            | NodeKind::Break
            | NodeKind::Link
            | NodeKind::Image
            | NodeKind::Html
    )
}

/// Escapes inline punctuation, then neutralizes characters that would start
/// a block construct at the beginning of a line.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut line_start = true;
    for c in text.chars() {
        let block_marker = line_start && matches!(c, '#' | '>' | '-' | '+' | '=');
        if block_marker || matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '~' | '|' | '!') {
            out.push('\\');
        }
        out.push(c);
        line_start = c == '\n';
    }
    out
}

fn longest_run(text: &str, needle: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == needle {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}
