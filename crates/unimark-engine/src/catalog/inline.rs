use std::sync::{Arc, LazyLock};

use serde_json::Value;

use super::{Command, apply_mark, attrs, command, single, string_or_null};
use crate::editor::{Attrs, EditorNode, Grammar, GrammarFragment, Mark, MarkSpec, NodeSpec};
use crate::error::ConvertError;
use crate::extension::{ConvertContext, Extension, ExtensionRef, Payload};
use crate::mdast::{ExternalNode, NodeKind};

pub struct Text;

impl Extension for Text {
    fn name(&self) -> &str {
        "text"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Text)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("text")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(NodeSpec::leaf().inline().group("inline")))
    }

    /// Empty text vanishes; the editor tree has no empty text nodes.
    fn to_editor(
        &self,
        node: &ExternalNode,
        _children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        match node.value.as_deref() {
            Some(value) if !value.is_empty() => Ok(vec![grammar.text(value, vec![])?]),
            _ => Ok(vec![]),
        }
    }

    fn to_external(
        &self,
        node: &EditorNode,
        _children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::text(node.text().unwrap_or_default())])
    }
}

pub struct HardBreak;

impl Extension for HardBreak {
    fn name(&self) -> &str {
        "hard_break"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Break)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("hard_break")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(NodeSpec::leaf().inline().group("inline")))
    }

    fn to_editor(
        &self,
        _node: &ExternalNode,
        _children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        single(grammar, "hard_break", Attrs::new(), vec![])
    }

    fn to_external(
        &self,
        _node: &EditorNode,
        _children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::void(NodeKind::Break)])
    }

    fn keymap(&self) -> Vec<(String, Payload)> {
        vec![
            ("Shift-Enter".into(), command(Command::InsertNode("hard_break"))),
            ("Mod-Enter".into(), command(Command::InsertNode("hard_break"))),
        ]
    }
}

pub struct Image;

impl Extension for Image {
    fn name(&self) -> &str {
        "image"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Image)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("image")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(
            NodeSpec::leaf()
                .inline()
                .atom()
                .group("inline")
                .required_attr("src")
                .attr("alt", Value::Null)
                .attr("title", Value::Null),
        ))
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        _children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let attrs = attrs([
            ("src", node.data_str("url").unwrap_or_default().into()),
            ("alt", string_or_null(node.data_str("alt"))),
            ("title", string_or_null(node.data_str("title"))),
        ]);
        single(grammar, "image", attrs, vec![])
    }

    fn to_external(
        &self,
        node: &EditorNode,
        _children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let mut image = ExternalNode::void(NodeKind::Image).with_data("url", node.attr_str("src").unwrap_or_default());
        if let Some(alt) = node.attr_str("alt") {
            image = image.with_data("alt", alt);
        }
        if let Some(title) = node.attr_str("title") {
            image = image.with_data("title", title);
        }
        Ok(vec![image])
    }
}

/// A mark that maps one-to-one onto an external phrasing container
/// (`emphasis`, `strong`, `delete`).
pub struct WrappingMark {
    pub(crate) name: &'static str,
    pub(crate) kind: NodeKind,
    pub(crate) key: Option<&'static str>,
}

impl Extension for WrappingMark {
    fn name(&self) -> &str {
        self.name
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(self.kind.clone())
    }

    fn editor_type(&self) -> Option<&str> {
        Some(self.name)
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Mark(MarkSpec::default()))
    }

    fn to_editor(
        &self,
        _node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let mark = grammar.mark(self.name, Attrs::new())?;
        apply_mark(grammar, children, &mark)
    }

    fn mark_to_external(
        &self,
        _mark: &Mark,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::parent(self.kind.clone(), children)])
    }

    fn keymap(&self) -> Vec<(String, Payload)> {
        self.key
            .map(|key| (key.to_string(), command(Command::ToggleMark(self.name))))
            .into_iter()
            .collect()
    }
}

/// Inline code: a text node carrying the `code` mark.
pub struct InlineCode;

impl Extension for InlineCode {
    fn name(&self) -> &str {
        "code"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::InlineCode)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("code")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Mark(MarkSpec::default().exclusive()))
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
        match node.value.as_deref() {
            Some(value) if !value.is_empty() => {
                let mark = grammar.mark("code", Attrs::new())?;
                Ok(vec![grammar.text(value, vec![mark])?])
            }
            _ => Ok(vec![]),
        }
    }

    /// Collapses the run into one literal; marks nested inside the code
    /// span have no markdown spelling and are dropped.
    fn mark_to_external(
        &self,
        _mark: &Mark,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let value: String = children.iter().map(ExternalNode::text_content).collect();
        Ok(vec![ExternalNode::literal(NodeKind::InlineCode, value)])
    }

    fn keymap(&self) -> Vec<(String, Payload)> {
        vec![("Mod-`".into(), command(Command::ToggleMark("code")))]
    }
}

pub struct Link;

impl Extension for Link {
    fn name(&self) -> &str {
        "link"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Link)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("link")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Mark(
            MarkSpec::default().required_attr("href").attr("title", Value::Null).exclusive(),
        ))
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let Some(url) = node.data_str("url") else {
            return Err(ConvertError::Rejected {
                extension: self.name().to_string(),
                message: "link without url".to_string(),
            });
        };
        let mark = grammar.mark(
            "link",
            attrs([("href", url.into()), ("title", string_or_null(node.data_str("title")))]),
        )?;
        apply_mark(grammar, children, &mark)
    }

    fn mark_to_external(
        &self,
        mark: &Mark,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let mut link = ExternalNode::parent(NodeKind::Link, children).with_data("url", mark.attr_str("href").unwrap_or_default());
        if let Some(title) = mark.attr_str("title") {
            link = link.with_data("title", title);
        }
        Ok(vec![link])
    }

    fn keymap(&self) -> Vec<(String, Payload)> {
        vec![("Mod-k".into(), command(Command::ToggleMark("link")))]
    }
}

static TEXT: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(Text));
static HARD_BREAK: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(HardBreak));
static IMAGE: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(Image));
static INLINE_CODE: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(InlineCode));
static LINK: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(Link));
static EM: LazyLock<ExtensionRef> = LazyLock::new(|| {
    Arc::new(WrappingMark {
        name: "em",
        kind: NodeKind::Emphasis,
        key: Some("Mod-i"),
    })
});
static STRONG: LazyLock<ExtensionRef> = LazyLock::new(|| {
    Arc::new(WrappingMark {
        name: "strong",
        kind: NodeKind::Strong,
        key: Some("Mod-b"),
    })
});

pub fn text() -> ExtensionRef {
    TEXT.clone()
}

pub fn hard_break() -> ExtensionRef {
    HARD_BREAK.clone()
}

pub fn image() -> ExtensionRef {
    IMAGE.clone()
}

pub fn em() -> ExtensionRef {
    EM.clone()
}

pub fn strong() -> ExtensionRef {
    STRONG.clone()
}

pub fn code() -> ExtensionRef {
    INLINE_CODE.clone()
}

pub fn link() -> ExtensionRef {
    LINK.clone()
}
