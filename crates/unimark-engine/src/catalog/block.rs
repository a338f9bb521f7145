use std::sync::{Arc, LazyLock};

use serde_json::Value;

use super::{attrs, input_rule, single, string_or_null};
use crate::editor::{Attrs, EditorNode, Grammar, GrammarFragment, MarkPolicy, NodeSpec};
use crate::error::ConvertError;
use crate::extension::{ConvertContext, Extension, ExtensionRef, Payload};
use crate::mdast::{ExternalNode, NodeKind};

use super::inline::text;

pub struct Doc;

impl Extension for Doc {
    fn name(&self) -> &str {
        "doc"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Root)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("doc")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(NodeSpec::with_content("block*")))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![paragraph(), text()]
    }

    fn to_editor(
        &self,
        _node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        single(grammar, "doc", Attrs::new(), children)
    }

    fn to_external(
        &self,
        _node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::parent(NodeKind::Root, children)])
    }
}

pub struct Paragraph;

impl Extension for Paragraph {
    fn name(&self) -> &str {
        "paragraph"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Paragraph)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("paragraph")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(NodeSpec::with_content("inline*").group("block")))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![text()]
    }

    fn to_editor(
        &self,
        _node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        single(grammar, "paragraph", Attrs::new(), children)
    }

    fn to_external(
        &self,
        _node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::parent(NodeKind::Paragraph, children)])
    }
}

pub struct Heading;

impl Extension for Heading {
    fn name(&self) -> &str {
        "heading"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Heading)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("heading")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(
            NodeSpec::with_content("inline*").group("block").defining().attr("level", 1),
        ))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![text()]
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let level = node.data_u64("depth").unwrap_or(1);
        single(grammar, "heading", attrs([("level", level.into())]), children)
    }

    fn to_external(
        &self,
        node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let depth = node.attr_u64("level").unwrap_or(1);
        Ok(vec![ExternalNode::parent(NodeKind::Heading, children).with_data("depth", depth)])
    }

    fn input_rules(&self) -> Vec<Payload> {
        vec![input_rule(r"^(#{1,6})\s$", "heading")]
    }
}

pub struct Blockquote;

impl Extension for Blockquote {
    fn name(&self) -> &str {
        "blockquote"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Blockquote)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("blockquote")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(NodeSpec::with_content("block*").group("block").defining()))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![paragraph()]
    }

    fn to_editor(
        &self,
        _node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        single(grammar, "blockquote", Attrs::new(), children)
    }

    fn to_external(
        &self,
        _node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::parent(NodeKind::Blockquote, children)])
    }

    fn input_rules(&self) -> Vec<Payload> {
        vec![input_rule(r"^\s*>\s$", "blockquote")]
    }
}

/// Fenced or indented code. The literal becomes a single unmarked text child.
pub struct CodeBlock;

impl Extension for CodeBlock {
    fn name(&self) -> &str {
        "code_block"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Code)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("code_block")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(
            NodeSpec::with_content("text*")
                .group("block")
                .code()
                .defining()
                .marks(MarkPolicy::None)
                .attr("language", Value::Null)
                .attr("meta", Value::Null),
        ))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![text()]
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        _children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let content = match node.value.as_deref() {
            Some(value) if !value.is_empty() => vec![grammar.text(value, vec![])?],
            _ => vec![],
        };
        let attrs = attrs([
            ("language", string_or_null(node.data_str("lang"))),
            ("meta", string_or_null(node.data_str("meta"))),
        ]);
        single(grammar, "code_block", attrs, content)
    }

    fn to_external(
        &self,
        node: &EditorNode,
        _children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let mut code = ExternalNode::literal(NodeKind::Code, node.text_content());
        if let Some(lang) = node.attr_str("language") {
            code = code.with_data("lang", lang);
        }
        if let Some(meta) = node.attr_str("meta") {
            code = code.with_data("meta", meta);
        }
        Ok(vec![code])
    }

    fn input_rules(&self) -> Vec<Payload> {
        vec![input_rule(r"^```([a-z]*)?\s$", "code_block")]
    }
}

pub struct HorizontalRule;

impl Extension for HorizontalRule {
    fn name(&self) -> &str {
        "horizontal_rule"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::ThematicBreak)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("horizontal_rule")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(NodeSpec::leaf().group("block")))
    }

    fn to_editor(
        &self,
        _node: &ExternalNode,
        _children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        single(grammar, "horizontal_rule", Attrs::new(), vec![])
    }

    fn to_external(
        &self,
        _node: &EditorNode,
        _children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::void(NodeKind::ThematicBreak)])
    }

    fn input_rules(&self) -> Vec<Payload> {
        vec![input_rule(r"^(?:---|\*\*\*|___)$", "horizontal_rule")]
    }
}

pub struct List;

impl Extension for List {
    fn name(&self) -> &str {
        "list"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::List)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("list")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(
            NodeSpec::with_content("list_item+")
                .group("block")
                .attr("ordered", false)
                .attr("start", 1),
        ))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![list_item()]
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let attrs = attrs([
            ("ordered", node.data_bool("ordered").unwrap_or(false).into()),
            ("start", node.data_u64("start").unwrap_or(1).into()),
        ]);
        single(grammar, "list", attrs, children)
    }

    fn to_external(
        &self,
        node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let ordered = node.attr_bool("ordered").unwrap_or(false);
        let mut list = ExternalNode::parent(NodeKind::List, children).with_data("ordered", ordered);
        if ordered {
            list = list.with_data("start", node.attr_u64("start").unwrap_or(1));
        }
        Ok(vec![list])
    }

    fn input_rules(&self) -> Vec<Payload> {
        vec![
            input_rule(r"^\s*([-+*])\s$", "list"),
            input_rule(r"^(\d+)\.\s$", "list"),
        ]
    }
}

/// A list item. `checked` is `null` unless the item is a task.
pub struct ListItem;

impl Extension for ListItem {
    fn name(&self) -> &str {
        "list_item"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::ListItem)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("list_item")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(
            NodeSpec::with_content("block*").defining().attr("checked", Value::Null),
        ))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![paragraph()]
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let checked = node.data_bool("checked").map_or(Value::Null, Value::Bool);
        single(grammar, "list_item", attrs([("checked", checked)]), children)
    }

    fn to_external(
        &self,
        node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let mut item = ExternalNode::parent(NodeKind::ListItem, children);
        if let Some(checked) = node.attr_bool("checked") {
            item = item.with_data("checked", checked);
        }
        Ok(vec![item])
    }
}

static DOC: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(Doc));
static PARAGRAPH: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(Paragraph));
static HEADING: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(Heading));
static BLOCKQUOTE: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(Blockquote));
static CODE_BLOCK: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(CodeBlock));
static HORIZONTAL_RULE: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(HorizontalRule));
static LIST: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(List));
static LIST_ITEM: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(ListItem));

pub fn doc() -> ExtensionRef {
    DOC.clone()
}

pub fn paragraph() -> ExtensionRef {
    PARAGRAPH.clone()
}

pub fn heading() -> ExtensionRef {
    HEADING.clone()
}

pub fn blockquote() -> ExtensionRef {
    BLOCKQUOTE.clone()
}

pub fn code_block() -> ExtensionRef {
    CODE_BLOCK.clone()
}

pub fn horizontal_rule() -> ExtensionRef {
    HORIZONTAL_RULE.clone()
}

pub fn list() -> ExtensionRef {
    LIST.clone()
}

pub fn list_item() -> ExtensionRef {
    LIST_ITEM.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::compose;
    use pretty_assertions::assert_eq;

    #[test]
    fn heading_level_maps_to_depth() {
        let composition = compose(&[heading(), doc()]).unwrap();
        let grammar = composition.grammar();
        let mut cx = ConvertContext::new();
        let external = ExternalNode::parent(NodeKind::Heading, vec![]).with_data("depth", 3);
        let converted = Heading.to_editor(&external, vec![], grammar, &mut cx).unwrap();
        assert_eq!(converted[0].attr_u64("level"), Some(3));

        let back = Heading.to_external(&converted[0], vec![], grammar, &mut cx).unwrap();
        assert_eq!(back[0].data_u64("depth"), Some(3));
    }

    #[test]
    fn code_block_keeps_language_and_text() {
        let composition = compose(&[doc(), code_block()]).unwrap();
        let grammar = composition.grammar();
        let mut cx = ConvertContext::new();
        let external = ExternalNode::literal(NodeKind::Code, "let x = 1;").with_data("lang", "rust");
        let converted = CodeBlock.to_editor(&external, vec![], grammar, &mut cx).unwrap();
        assert_eq!(converted[0].attr_str("language"), Some("rust"));
        assert_eq!(converted[0].attr("meta"), Some(&Value::Null));
        assert_eq!(converted[0].text_content(), "let x = 1;");

        let back = CodeBlock.to_external(&converted[0], vec![], grammar, &mut cx).unwrap();
        assert_eq!(back[0], external);
    }

    #[test]
    fn empty_code_block_has_no_text_child() {
        let composition = compose(&[doc(), code_block()]).unwrap();
        let external = ExternalNode::literal(NodeKind::Code, "");
        let converted = CodeBlock
            .to_editor(&external, vec![], composition.grammar(), &mut ConvertContext::new())
            .unwrap();
        assert!(converted[0].content().is_empty());
    }

    #[test]
    fn task_item_checked_survives() {
        let composition = compose(&[doc(), list()]).unwrap();
        let grammar = composition.grammar();
        let mut cx = ConvertContext::new();
        let external = ExternalNode::parent(NodeKind::ListItem, vec![]).with_data("checked", true);
        let converted = ListItem.to_editor(&external, vec![], grammar, &mut cx).unwrap();
        let back = ListItem.to_external(&converted[0], vec![], grammar, &mut cx).unwrap();
        assert_eq!(back[0].data_bool("checked"), Some(true));

        let plain = ExternalNode::parent(NodeKind::ListItem, vec![]);
        let converted = ListItem.to_editor(&plain, vec![], grammar, &mut cx).unwrap();
        let back = ListItem.to_external(&converted[0], vec![], grammar, &mut cx).unwrap();
        assert_eq!(back[0].data_bool("checked"), None);
    }
}
