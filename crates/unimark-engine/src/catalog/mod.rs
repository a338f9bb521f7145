//! # Extension Catalog
//!
//! Concrete extensions for CommonMark and GFM, plus the HTML inlay.
//!
//! - **`block`**: document, paragraphs, headings, quotes, code blocks, lists
//! - **`inline`**: text, hard breaks, images and the inline marks
//! - **`gfm`**: strikethrough and tables
//! - **`html`**: raw HTML as an inline atom, with the reconciliation passes
//!
//! Every extension is a shared instance, so requesting the same one twice
//! (directly or through dependencies) composes it once. Bundles (`markdown`,
//! `gfm`, `gfm_tables`) are extensions with dependencies and nothing else.

pub mod block;
pub mod gfm;
pub mod html;
pub mod inline;

use std::sync::{Arc, LazyLock};

use serde_json::Value;

use crate::editor::{Attrs, EditorNode, Grammar, Mark};
use crate::error::ConvertError;
use crate::extension::{Extension, ExtensionRef, Payload};
use crate::reconcile::HtmlOptions;

/// Editor commands bound in keymaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleMark(&'static str),
    InsertNode(&'static str),
    GoToNextCell,
    GoToPreviousCell,
}

/// Typing `pattern` at the start of a textblock turns it into `produces`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRule {
    pub pattern: &'static str,
    pub produces: &'static str,
}

pub(crate) fn command(command: Command) -> Payload {
    Arc::new(command)
}

pub(crate) fn input_rule(pattern: &'static str, produces: &'static str) -> Payload {
    Arc::new(InputRule { pattern, produces })
}

pub(crate) fn attrs<const N: usize>(pairs: [(&str, Value); N]) -> Attrs {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Builds one validated node as a converter result.
pub(crate) fn single(
    grammar: &Grammar,
    type_name: &str,
    attrs: Attrs,
    content: Vec<EditorNode>,
) -> Result<Vec<EditorNode>, ConvertError> {
    Ok(vec![grammar.node(type_name, attrs, content)?])
}

/// Adds `mark` to every converted child.
pub(crate) fn apply_mark(
    grammar: &Grammar,
    children: Vec<EditorNode>,
    mark: &Mark,
) -> Result<Vec<EditorNode>, ConvertError> {
    children
        .into_iter()
        .map(|child| grammar.add_mark(child, mark.clone()).map_err(ConvertError::from))
        .collect()
}

/// A string-valued data field as an attribute value, `null` when absent.
pub(crate) fn string_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

struct Bundle {
    name: &'static str,
    members: fn() -> Vec<ExtensionRef>,
}

impl Extension for Bundle {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        (self.members)()
    }
}

static MARKDOWN: LazyLock<ExtensionRef> = LazyLock::new(|| {
    Arc::new(Bundle {
        name: "markdown",
        members: || {
            vec![
                block::doc(),
                inline::text(),
                block::paragraph(),
                block::heading(),
                block::blockquote(),
                block::code_block(),
                block::horizontal_rule(),
                inline::hard_break(),
                inline::image(),
                block::list(),
                block::list_item(),
                inline::link(),
                inline::em(),
                inline::strong(),
                inline::code(),
            ]
        },
    })
});

static GFM_TABLES: LazyLock<ExtensionRef> = LazyLock::new(|| {
    Arc::new(Bundle {
        name: "gfm_tables",
        members: || vec![gfm::table(), gfm::table_row(), gfm::table_cell()],
    })
});

static GFM: LazyLock<ExtensionRef> = LazyLock::new(|| {
    Arc::new(Bundle {
        name: "gfm",
        members: || vec![markdown(), gfm::strikethrough(), gfm_tables()],
    })
});

/// CommonMark nodes and marks.
pub fn markdown() -> ExtensionRef {
    MARKDOWN.clone()
}

/// CommonMark plus strikethrough and tables.
pub fn gfm() -> ExtensionRef {
    GFM.clone()
}

pub fn gfm_tables() -> ExtensionRef {
    GFM_TABLES.clone()
}

/// Names accepted by [`catalog`], one per extension.
pub const CATALOG_NAMES: &[&str] = &[
    "markdown",
    "gfm",
    "gfm_tables",
    "html",
    "doc",
    "text",
    "paragraph",
    "heading",
    "blockquote",
    "code_block",
    "horizontal_rule",
    "hard_break",
    "image",
    "list",
    "list_item",
    "em",
    "strong",
    "code",
    "link",
    "strikethrough",
    "table",
    "table_row",
    "table_cell",
];

/// Looks an extension up by editor name, or by external name where that is
/// unambiguous (`code` is the inline code mark; the block is `code_block`).
pub fn catalog(name: &str, html_options: &HtmlOptions) -> Option<ExtensionRef> {
    let ext = match name {
        "markdown" => markdown(),
        "gfm" => gfm(),
        "gfm_tables" => gfm_tables(),
        "html" => html::html(*html_options),
        "doc" | "root" => block::doc(),
        "text" => inline::text(),
        "paragraph" => block::paragraph(),
        "heading" => block::heading(),
        "blockquote" => block::blockquote(),
        "code_block" => block::code_block(),
        "horizontal_rule" | "thematicBreak" => block::horizontal_rule(),
        "hard_break" | "break" => inline::hard_break(),
        "image" => inline::image(),
        "list" => block::list(),
        "list_item" | "listItem" => block::list_item(),
        "em" | "emphasis" => inline::em(),
        "strong" => inline::strong(),
        "code" | "inlineCode" => inline::code(),
        "link" => inline::link(),
        "strikethrough" | "delete" => gfm::strikethrough(),
        "table" => gfm::table(),
        "table_row" | "tableRow" => gfm::table_row(),
        "table_cell" | "tableCell" => gfm::table_cell(),
        _ => return None,
    };
    Some(ext)
}
