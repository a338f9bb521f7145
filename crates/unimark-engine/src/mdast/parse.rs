//! Parser adapter: markdown source to [`ExternalNode`] tree.
//!
//! Walks `pulldown-cmark` offset events and assembles an mdast-shaped tree.
//! The shape follows what remark produces for the same input, which is what
//! the reconciliation and fixup passes are written against:
//!
//! - every inline HTML tag is its own `html` literal inside the paragraph
//! - an HTML block is one `html` literal directly under its block parent
//! - adjacent text and soft breaks collapse into a single `text`
//! - inline content of a tight list item is wrapped in an implicit `paragraph`
//! - the table head becomes an ordinary `tableRow` (with `head: true` data)

use std::ops::Range;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde_json::Value;

use super::{ExternalNode, NodeKind};
use crate::position::Position;

/// Parses `source` into an external tree rooted at a `root` node.
pub fn parse(source: &str) -> ExternalNode {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::new(source);
    for (event, range) in Parser::new_ext(source, options).into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}

/// What a frame does with the text events it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collect {
    /// Text becomes child nodes.
    Children,
    /// Text accumulates into the node's literal value (code and HTML blocks).
    Literal,
    /// Text accumulates into the `alt` data field (images).
    Alt,
}

#[derive(Debug)]
struct Frame {
    node: ExternalNode,
    start: usize,
    collect: Collect,
    buffer: String,
    /// Inline tags swallowed while collecting; their ends must be skipped too.
    swallowed: usize,
    /// Paragraph opened by the builder rather than by the parser.
    implicit: bool,
}

impl Frame {
    fn new(node: ExternalNode, start: usize) -> Self {
        Self {
            node,
            start,
            collect: Collect::Children,
            buffer: String::new(),
            swallowed: 0,
            implicit: false,
        }
    }

    fn collecting(mut self, collect: Collect) -> Self {
        self.collect = collect;
        self
    }
}

struct TreeBuilder<'s> {
    source: &'s str,
    stack: Vec<Frame>,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            stack: vec![Frame::new(ExternalNode::parent(NodeKind::Root, vec![]), 0)],
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        if self.top().collect != Collect::Children {
            self.collecting_event(event, range);
            return;
        }

        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(end) => self.end(end, range),
            Event::Text(text) => {
                self.ensure_inline_context(range.start);
                self.push_text(&text, range);
            }
            Event::SoftBreak => {
                self.ensure_inline_context(range.start);
                self.push_text("\n", range);
            }
            Event::HardBreak => {
                self.push_inline(ExternalNode::void(NodeKind::Break), range);
            }
            Event::Code(code) => {
                self.push_inline(ExternalNode::literal(NodeKind::InlineCode, code.as_ref()), range);
            }
            Event::InlineHtml(html) | Event::Html(html) => {
                self.push_inline(ExternalNode::html(html.as_ref()), range);
            }
            Event::InlineMath(math) => {
                self.push_inline(ExternalNode::literal("inlineMath", math.as_ref()), range);
            }
            Event::DisplayMath(math) => {
                self.push_inline(ExternalNode::literal("math", math.as_ref()), range);
            }
            Event::FootnoteReference(label) => {
                let node = ExternalNode::void("footnoteReference").with_data("label", label.as_ref());
                self.push_inline(node, range);
            }
            Event::Rule => {
                self.close_implicit();
                let end = self.trimmed_end(&range);
                let node = ExternalNode::void(NodeKind::ThematicBreak).at(range.start, end);
                self.append(node);
            }
            Event::TaskListMarker(checked) => {
                if let Some(item) = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|f| f.node.kind == NodeKind::ListItem)
                {
                    item.node.data.insert("checked".into(), Value::Bool(checked));
                }
            }
        }
    }

    fn collecting_event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Text(text) | Event::Code(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.top_mut().buffer.push_str(&text)
            }
            Event::SoftBreak | Event::HardBreak => self.top_mut().buffer.push('\n'),
            Event::Start(_) => self.top_mut().swallowed += 1,
            Event::End(_) => {
                let top = self.top_mut();
                if top.swallowed > 0 {
                    top.swallowed -= 1;
                } else {
                    self.close_top(self.trimmed_end(&range));
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let inline = matches!(
            tag,
            Tag::Emphasis
                | Tag::Strong
                | Tag::Strikethrough
                | Tag::Link { .. }
                | Tag::Image { .. }
                | Tag::Superscript
                | Tag::Subscript
        );
        if inline {
            self.ensure_inline_context(range.start);
        } else {
            self.close_implicit();
        }

        let start = range.start;
        let frame = match tag {
            Tag::Paragraph => Frame::new(ExternalNode::parent(NodeKind::Paragraph, vec![]), start),
            Tag::Heading { level, .. } => Frame::new(
                ExternalNode::parent(NodeKind::Heading, vec![]).with_data("depth", level as u8),
                start,
            ),
            Tag::BlockQuote(_) => Frame::new(ExternalNode::parent(NodeKind::Blockquote, vec![]), start),
            Tag::CodeBlock(kind) => {
                let mut node = ExternalNode::literal(NodeKind::Code, "");
                if let CodeBlockKind::Fenced(info) = kind {
                    let mut parts = info.splitn(2, char::is_whitespace);
                    if let Some(lang) = parts.next().filter(|l| !l.is_empty()) {
                        node = node.with_data("lang", lang);
                    }
                    if let Some(meta) = parts.next().map(str::trim).filter(|m| !m.is_empty()) {
                        node = node.with_data("meta", meta);
                    }
                }
                Frame::new(node, start).collecting(Collect::Literal)
            }
            Tag::HtmlBlock => Frame::new(ExternalNode::html(""), start).collecting(Collect::Literal),
            Tag::List(first) => {
                let mut node =
                    ExternalNode::parent(NodeKind::List, vec![]).with_data("ordered", first.is_some());
                if let Some(n) = first {
                    node = node.with_data("start", n);
                }
                Frame::new(node, start)
            }
            Tag::Item => Frame::new(ExternalNode::parent(NodeKind::ListItem, vec![]), start),
            Tag::Table(alignments) => {
                let align: Vec<Value> = alignments.iter().map(alignment_value).collect();
                Frame::new(
                    ExternalNode::parent(NodeKind::Table, vec![]).with_data("align", align),
                    start,
                )
            }
            Tag::TableHead => Frame::new(
                ExternalNode::parent(NodeKind::TableRow, vec![]).with_data("head", true),
                start,
            ),
            Tag::TableRow => Frame::new(ExternalNode::parent(NodeKind::TableRow, vec![]), start),
            Tag::TableCell => Frame::new(ExternalNode::parent(NodeKind::TableCell, vec![]), start),
            Tag::Emphasis => Frame::new(ExternalNode::parent(NodeKind::Emphasis, vec![]), start),
            Tag::Strong => Frame::new(ExternalNode::parent(NodeKind::Strong, vec![]), start),
            Tag::Strikethrough => Frame::new(ExternalNode::parent(NodeKind::Delete, vec![]), start),
            Tag::Link { dest_url, title, .. } => {
                let mut node =
                    ExternalNode::parent(NodeKind::Link, vec![]).with_data("url", dest_url.as_ref());
                if !title.is_empty() {
                    node = node.with_data("title", title.as_ref());
                }
                Frame::new(node, start)
            }
            Tag::Image { dest_url, title, .. } => {
                let mut node = ExternalNode::void(NodeKind::Image).with_data("url", dest_url.as_ref());
                if !title.is_empty() {
                    node = node.with_data("title", title.as_ref());
                }
                Frame::new(node, start).collecting(Collect::Alt)
            }
            Tag::FootnoteDefinition(label) => Frame::new(
                ExternalNode::parent("footnoteDefinition", vec![]).with_data("label", label.as_ref()),
                start,
            ),
            Tag::Superscript => Frame::new(ExternalNode::parent("superscript", vec![]), start),
            Tag::Subscript => Frame::new(ExternalNode::parent("subscript", vec![]), start),
            Tag::DefinitionList => Frame::new(ExternalNode::parent("definitionList", vec![]), start),
            Tag::DefinitionListTitle => {
                Frame::new(ExternalNode::parent("definitionTerm", vec![]), start)
            }
            Tag::DefinitionListDefinition => {
                Frame::new(ExternalNode::parent("definitionDescription", vec![]), start)
            }
            Tag::MetadataBlock(_) => {
                Frame::new(ExternalNode::literal("yaml", ""), start).collecting(Collect::Literal)
            }
        };
        self.stack.push(frame);
    }

    fn end(&mut self, _end: TagEnd, range: Range<usize>) {
        self.close_implicit();
        let end = self.trimmed_end(&range);
        self.close_top(end);
    }

    /// Opens an implicit paragraph when inline content lands directly in a
    /// list item (tight lists carry no paragraph events).
    fn ensure_inline_context(&mut self, start: usize) {
        if self.top().node.kind == NodeKind::ListItem {
            let mut frame = Frame::new(ExternalNode::parent(NodeKind::Paragraph, vec![]), start);
            frame.implicit = true;
            self.stack.push(frame);
        }
    }

    fn close_implicit(&mut self) {
        while self.top().implicit {
            let end = self
                .top()
                .node
                .children()
                .iter()
                .filter_map(|c| c.position)
                .map(|p| p.end)
                .max()
                .unwrap_or(self.top().start);
            self.close_top(end);
        }
    }

    fn close_top(&mut self, end: usize) {
        if self.stack.len() < 2 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let mut node = frame.node;
        match frame.collect {
            Collect::Children => {}
            Collect::Literal => {
                let value = frame.buffer.strip_suffix('\n').unwrap_or(&frame.buffer);
                node.value = Some(value.to_string());
            }
            Collect::Alt => {
                node.data.insert("alt".into(), Value::String(frame.buffer));
            }
        }
        node.position = Some(Position::new(frame.start, end.max(frame.start)));
        self.append(node);
    }

    fn push_inline(&mut self, node: ExternalNode, range: Range<usize>) {
        self.ensure_inline_context(range.start);
        self.append(node.at(range.start, range.end));
    }

    fn push_text(&mut self, text: &str, range: Range<usize>) {
        let here = Position::new(range.start, range.end);
        let children = self.top_mut().node.children.get_or_insert_with(Vec::new);
        if let Some(last) = children.last_mut()
            && last.kind == NodeKind::Text
            && let Some(value) = last.value.as_mut()
        {
            value.push_str(text);
            last.position = Some(last.position.map_or(here, |p| p.cover(here)));
            return;
        }
        children.push(ExternalNode::text(text).at(range.start, range.end));
    }

    fn append(&mut self, node: ExternalNode) {
        self.top_mut()
            .node
            .children
            .get_or_insert_with(Vec::new)
            .push(node);
    }

    fn top(&self) -> &Frame {
        // The root frame is never popped.
        &self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// End of `range` with trailing line endings excluded.
    fn trimmed_end(&self, range: &Range<usize>) -> usize {
        let text = self.source.get(range.clone()).unwrap_or("");
        range.start + text.trim_end_matches(['\n', '\r']).len()
    }

    fn finish(mut self) -> ExternalNode {
        self.close_implicit();
        while self.stack.len() > 1 {
            let end = self.source.len();
            self.close_top(end);
        }
        let mut root = self.stack.pop().map(|f| f.node).unwrap_or_else(|| {
            ExternalNode::parent(NodeKind::Root, vec![])
        });
        root.position = Some(Position::new(0, self.source.len()));
        root
    }
}

fn alignment_value(alignment: &Alignment) -> Value {
    match alignment {
        Alignment::None => Value::Null,
        Alignment::Left => Value::from("left"),
        Alignment::Center => Value::from("center"),
        Alignment::Right => Value::from("right"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(node: &ExternalNode) -> Vec<String> {
        node.children().iter().map(|c| c.kind.to_string()).collect()
    }

    #[test]
    fn empty_source_gives_empty_root() {
        let root = parse("");
        assert_eq!(root.kind, NodeKind::Root);
        assert_eq!(root.children(), &[]);
        assert_eq!(root.position, Some(Position::new(0, 0)));
    }

    #[test]
    fn paragraph_with_inline_html_tags() {
        let root = parse("a <b>x</b> c\n");
        let paragraph = &root.children()[0];
        assert_eq!(kinds(paragraph), ["text", "html", "text", "html", "text"]);
        assert_eq!(paragraph.children()[1].value.as_deref(), Some("<b>"));
        assert_eq!(paragraph.children()[1].position, Some(Position::new(2, 5)));
        assert_eq!(paragraph.children()[3].value.as_deref(), Some("</b>"));
        assert_eq!(paragraph.position, Some(Position::new(0, 12)));
    }

    #[test]
    fn html_block_is_single_literal_at_root() {
        let root = parse("<div>\n\nhello\n\n</div>\n");
        assert_eq!(kinds(&root), ["html", "paragraph", "html"]);
        assert_eq!(root.children()[0].value.as_deref(), Some("<div>"));
        assert_eq!(root.children()[0].position, Some(Position::new(0, 5)));
        assert_eq!(root.children()[2].value.as_deref(), Some("</div>"));
    }

    #[test]
    fn soft_breaks_merge_into_text() {
        let root = parse("one\ntwo\n");
        let paragraph = &root.children()[0];
        assert_eq!(kinds(paragraph), ["text"]);
        assert_eq!(paragraph.children()[0].value.as_deref(), Some("one\ntwo"));
        assert_eq!(paragraph.children()[0].position, Some(Position::new(0, 7)));
    }

    #[test]
    fn tight_list_items_get_implicit_paragraphs() {
        let root = parse("- a\n- [x] b\n");
        let list = &root.children()[0];
        assert_eq!(list.kind, NodeKind::List);
        assert_eq!(list.data_bool("ordered"), Some(false));
        let items = list.children();
        assert_eq!(items.len(), 2);
        assert_eq!(kinds(&items[0]), ["paragraph"]);
        assert_eq!(items[0].children()[0].text_content(), "a");
        assert_eq!(items[1].data_bool("checked"), Some(true));
    }

    #[test]
    fn heading_depth_and_code_block_lang() {
        let root = parse("## Title\n\n```rust\nfn main() {}\n```\n");
        assert_eq!(root.children()[0].data_u64("depth"), Some(2));
        let code = &root.children()[1];
        assert_eq!(code.kind, NodeKind::Code);
        assert_eq!(code.data_str("lang"), Some("rust"));
        assert_eq!(code.value.as_deref(), Some("fn main() {}"));
        assert_eq!(code.children, None);
    }

    #[test]
    fn image_alt_text_is_collected() {
        let root = parse("![an *alt*](img.png \"t\")\n");
        let image = &root.children()[0].children()[0];
        assert_eq!(image.kind, NodeKind::Image);
        assert_eq!(image.data_str("alt"), Some("an alt"));
        assert_eq!(image.data_str("url"), Some("img.png"));
        assert_eq!(image.data_str("title"), Some("t"));
    }

    #[test]
    fn table_head_becomes_row() {
        let root = parse("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        let table = &root.children()[0];
        assert_eq!(table.kind, NodeKind::Table);
        assert_eq!(kinds(table), ["tableRow", "tableRow"]);
        assert_eq!(table.children()[0].data_bool("head"), Some(true));
        assert_eq!(kinds(&table.children()[0]), ["tableCell", "tableCell"]);
        assert_eq!(table.data["align"], serde_json::json!(["left", "right"]));
    }
}
