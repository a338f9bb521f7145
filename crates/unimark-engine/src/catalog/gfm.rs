use std::sync::{Arc, LazyLock};

use serde_json::Value;

use super::inline::{WrappingMark, text};
use super::{Command, attrs, command, single};
use crate::editor::{Attrs, EditorNode, Grammar, GrammarFragment, NodeSpec};
use crate::error::ConvertError;
use crate::extension::{ConvertContext, Extension, ExtensionRef, Payload};
use crate::mdast::{ExternalNode, NodeKind};

/// A GFM table. `align` holds one entry per column: `"left"`, `"right"`,
/// `"center"` or `null`.
pub struct Table;

impl Extension for Table {
    fn name(&self) -> &str {
        "table"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Table)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("table")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(
            NodeSpec::with_content("table_row+")
                .group("block")
                .attr("align", Value::Array(vec![])),
        ))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![table_row()]
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let align = node.data.get("align").cloned().unwrap_or_else(|| Value::Array(vec![]));
        single(grammar, "table", attrs([("align", align)]), children)
    }

    fn to_external(
        &self,
        node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let align = node.attr("align").cloned().unwrap_or_else(|| Value::Array(vec![]));
        Ok(vec![ExternalNode::parent(NodeKind::Table, children).with_data("align", align)])
    }

    fn keymap(&self) -> Vec<(String, Payload)> {
        vec![
            ("Tab".into(), command(Command::GoToNextCell)),
            ("Shift-Tab".into(), command(Command::GoToPreviousCell)),
        ]
    }
}

/// A table row. The head row is marked with `header: true`.
pub struct TableRow;

impl Extension for TableRow {
    fn name(&self) -> &str {
        "table_row"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::TableRow)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("table_row")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(
            NodeSpec::with_content("table_cell*").attr("header", false),
        ))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        vec![table_cell()]
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        let header = node.data_bool("head").unwrap_or(false);
        single(grammar, "table_row", attrs([("header", header.into())]), children)
    }

    fn to_external(
        &self,
        node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        let mut row = ExternalNode::parent(NodeKind::TableRow, children);
        if node.attr_bool("header").unwrap_or(false) {
            row = row.with_data("head", true);
        }
        Ok(vec![row])
    }
}

pub struct TableCell;

impl Extension for TableCell {
    fn name(&self) -> &str {
        "table_cell"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::TableCell)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("table_cell")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(NodeSpec::with_content("inline*")))
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
        single(grammar, "table_cell", Attrs::new(), children)
    }

    fn to_external(
        &self,
        _node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::parent(NodeKind::TableCell, children)])
    }
}

static STRIKETHROUGH: LazyLock<ExtensionRef> = LazyLock::new(|| {
    Arc::new(WrappingMark {
        name: "strikethrough",
        kind: NodeKind::Delete,
        key: Some("Mod-Shift-s"),
    })
});
static TABLE: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(Table));
static TABLE_ROW: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(TableRow));
static TABLE_CELL: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(TableCell));

pub fn strikethrough() -> ExtensionRef {
    STRIKETHROUGH.clone()
}

pub fn table() -> ExtensionRef {
    TABLE.clone()
}

pub fn table_row() -> ExtensionRef {
    TABLE_ROW.clone()
}

pub fn table_cell() -> ExtensionRef {
    TABLE_CELL.clone()
}
