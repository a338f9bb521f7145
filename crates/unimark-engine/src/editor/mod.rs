//! # Editor Tree
//!
//! The schema-validated document an editing session works on.
//!
//! - **`content`**: content expressions (`"inline*"`, `"paragraph block*"`)
//! - **`grammar`**: node and mark specs, and the merged [`Grammar`] that is
//!   the only way to construct an [`EditorNode`]
//!
//! Nodes are immutable once built. Fields are private so a node that exists
//! has always passed grammar validation.

pub mod content;
pub mod grammar;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub use content::ContentExpr;
pub use grammar::{
    AttrSpec, Grammar, GrammarBuilder, GrammarFragment, MarkPolicy, MarkSpec, MarkType, NodeSpec, NodeType,
};

/// Attribute map of a node or mark.
pub type Attrs = BTreeMap<String, Value>;

/// An inline mark (emphasis, link, ...) attached to a text or inline node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub(crate) type_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) attrs: Attrs,
}

impl Mark {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }
}

/// A node of the editor tree. Build one with [`Grammar::node`] or
/// [`Grammar::text`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorNode {
    #[serde(rename = "type")]
    pub(crate) type_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) attrs: Attrs,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) content: Vec<EditorNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
    /// Ordered by mark rank, at most one mark per type.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) marks: Vec<Mark>,
}

impl EditorNode {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attrs.get(name).and_then(Value::as_u64)
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attrs.get(name).and_then(Value::as_bool)
    }

    pub fn content(&self) -> &[EditorNode] {
        &self.content
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn has_mark(&self, type_name: &str) -> bool {
        self.marks.iter().any(|m| m.type_name == type_name)
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.iter().map(EditorNode::text_content).collect(),
        }
    }

    /// Number of nodes in the subtree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.content.iter().map(EditorNode::node_count).sum::<usize>()
    }
}
