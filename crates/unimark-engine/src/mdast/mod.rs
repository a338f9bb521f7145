//! # External Tree
//!
//! The semantic (mdast-shaped) tree produced by the parser adapter and
//! consumed by the serializer adapter.
//!
//! ## Modules
//!
//! - **`arena`**: index-addressed flat copy of a tree used by passes that
//!   remove nodes by position
//! - **`parse`**: builds an [`ExternalNode`] tree from `pulldown-cmark` offset events
//! - **`serialize`**: renders an [`ExternalNode`] tree back to markdown text
//!
//! Nodes are plain owned records. Passes take a tree by value and hand back a
//! freshly built one, so no pass ever observes another pass half-way through.

pub(crate) mod arena;
pub mod parse;
pub mod serialize;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::position::Position;

pub use parse::parse;
pub use serialize::serialize;

/// The type tag of an external node.
///
/// The well-known mdast kinds are spelled out so the engine's own passes can
/// match on them; anything an extension introduces lives in [`NodeKind::Other`].
/// Serializes as the mdast type string (`"inlineCode"`, `"tableRow"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Root,
    Paragraph,
    Heading,
    Text,
    Emphasis,
    Strong,
    Delete,
    InlineCode,
    Code,
    Html,
    Blockquote,
    List,
    ListItem,
    ThematicBreak,
    Break,
    Link,
    Image,
    Table,
    TableRow,
    TableCell,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::Text => "text",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::Delete => "delete",
            NodeKind::InlineCode => "inlineCode",
            NodeKind::Code => "code",
            NodeKind::Html => "html",
            NodeKind::Blockquote => "blockquote",
            NodeKind::List => "list",
            NodeKind::ListItem => "listItem",
            NodeKind::ThematicBreak => "thematicBreak",
            NodeKind::Break => "break",
            NodeKind::Link => "link",
            NodeKind::Image => "image",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableCell => "tableCell",
            NodeKind::Other(name) => name,
        }
    }

    /// Containers whose children are phrasing (inline) content.
    ///
    /// An `html` literal is only valid as a direct child of one of these.
    pub fn holds_phrasing(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading
                | NodeKind::TableCell
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Delete
                | NodeKind::Link
        )
    }
}

impl From<&str> for NodeKind {
    fn from(name: &str) -> Self {
        match name {
            "root" => NodeKind::Root,
            "paragraph" => NodeKind::Paragraph,
            "heading" => NodeKind::Heading,
            "text" => NodeKind::Text,
            "emphasis" => NodeKind::Emphasis,
            "strong" => NodeKind::Strong,
            "delete" => NodeKind::Delete,
            "inlineCode" => NodeKind::InlineCode,
            "code" => NodeKind::Code,
            "html" => NodeKind::Html,
            "blockquote" => NodeKind::Blockquote,
            "list" => NodeKind::List,
            "listItem" => NodeKind::ListItem,
            "thematicBreak" => NodeKind::ThematicBreak,
            "break" => NodeKind::Break,
            "link" => NodeKind::Link,
            "image" => NodeKind::Image,
            "table" => NodeKind::Table,
            "tableRow" => NodeKind::TableRow,
            "tableCell" => NodeKind::TableCell,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(name: String) -> Self {
        NodeKind::from(name.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the external (semantic) tree.
///
/// Exactly one of `value` / `children` is meaningful for a given kind: leaf
/// kinds (`text`, `html`, `code`, `inlineCode`) carry a literal `value`,
/// container kinds carry `children`. The split is a per-kind convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ExternalNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

impl ExternalNode {
    /// A container node with the given children.
    pub fn parent(kind: impl Into<NodeKind>, children: Vec<ExternalNode>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
            children: Some(children),
            position: None,
            data: BTreeMap::new(),
        }
    }

    /// A leaf node carrying a literal value.
    pub fn literal(kind: impl Into<NodeKind>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: Some(value.into()),
            children: None,
            position: None,
            data: BTreeMap::new(),
        }
    }

    /// A leaf node with neither value nor children (`thematicBreak`, `break`).
    pub fn void(kind: impl Into<NodeKind>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
            children: None,
            position: None,
            data: BTreeMap::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::literal(NodeKind::Text, value)
    }

    pub fn html(value: impl Into<String>) -> Self {
        Self::literal(NodeKind::Html, value)
    }

    #[must_use]
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.position = Some(Position::new(start, end));
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// True for nodes that carry a literal value.
    pub fn is_literal(&self) -> bool {
        self.value.is_some()
    }

    pub fn children(&self) -> &[ExternalNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn data_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(Value::as_u64)
    }

    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    /// Concatenated literal text of this subtree, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(value) = &self.value {
            out.push_str(value);
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }

    /// Type names and child counts of the whole subtree, ignoring values,
    /// positions and data. Two trees with equal shapes are structurally equivalent.
    pub fn shape(&self) -> Shape {
        Shape {
            kind: self.kind.clone(),
            children: self.children.as_ref().map(|c| c.iter().map(Self::shape).collect()),
        }
    }
}

/// Structural fingerprint of an external subtree (see [`ExternalNode::shape`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub kind: NodeKind,
    pub children: Option<Vec<Shape>>,
}
