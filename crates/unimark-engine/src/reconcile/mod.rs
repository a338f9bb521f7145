//! # HTML Reconciliation
//!
//! The markdown parser emits raw HTML one tag at a time, so a logical
//! `<tag>...</tag>` span arrives as separate literals, possibly in different
//! blocks. These passes repair the external tree before down-conversion.
//!
//! - **`classify`**: decides whether a literal is a single tag and which kind
//! - **`pair`**: merges each opening tag with its nearest closing tag
//! - **`fixup`**: moves `html` literals left at block level into paragraphs
//!
//! Both passes are exposed as [`TreeTransform`]s, contributed to a
//! composition by the `html` extension.

pub mod classify;
pub mod fixup;
pub mod pair;

pub use classify::{Flow, FlowKind, VOID_ELEMENTS, classify, is_flow, is_void_element};
pub use fixup::fix_root_html;
pub use pair::reconcile;

use crate::error::EngineError;
use crate::extension::TreeTransform;
use crate::mdast::ExternalNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Void elements (`br`, `img`, ...) never open a merged span.
    pub skip_void_elements: bool,
    /// Run the block-level fixup after pairing.
    pub fix_root_html: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            skip_void_elements: false,
            fix_root_html: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HtmlReconcile {
    pub options: HtmlOptions,
}

impl TreeTransform for HtmlReconcile {
    fn name(&self) -> &str {
        "html-reconcile"
    }

    fn apply(&self, tree: ExternalNode) -> Result<ExternalNode, EngineError> {
        Ok(reconcile(tree, &self.options)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RootHtmlFixup;

impl TreeTransform for RootHtmlFixup {
    fn name(&self) -> &str {
        "root-html-fixup"
    }

    fn apply(&self, tree: ExternalNode) -> Result<ExternalNode, EngineError> {
        Ok(fix_root_html(tree))
    }
}
