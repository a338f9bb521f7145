use std::sync::{Arc, LazyLock};

use super::inline::text;
use super::single;
use crate::editor::{Attrs, EditorNode, Grammar, GrammarFragment, MarkPolicy, NodeSpec};
use crate::error::ConvertError;
use crate::extension::{ConvertContext, Extension, ExtensionRef, TransformRef};
use crate::mdast::{ExternalNode, NodeKind};
use crate::reconcile::{HtmlOptions, HtmlReconcile, RootHtmlFixup};

/// Raw HTML kept as an inline atom whose only content is its source text.
///
/// Contributes the tag reconciliation pass and, unless disabled, the fixup
/// that moves block-level HTML into paragraphs.
pub struct HtmlInlay {
    options: HtmlOptions,
}

impl HtmlInlay {
    pub fn new(options: HtmlOptions) -> Self {
        Self { options }
    }
}

impl Extension for HtmlInlay {
    fn name(&self) -> &str {
        "html"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Html)
    }

    fn editor_type(&self) -> Option<&str> {
        Some("html")
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        Some(GrammarFragment::Node(
            NodeSpec::with_content("text*")
                .inline()
                .atom()
                .group("inline")
                .marks(MarkPolicy::None),
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
        single(grammar, "html", Attrs::new(), content)
    }

    fn to_external(
        &self,
        node: &EditorNode,
        _children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Ok(vec![ExternalNode::html(node.text_content())])
    }

    fn transforms(&self) -> Vec<TransformRef> {
        let mut transforms: Vec<TransformRef> = vec![Arc::new(HtmlReconcile {
            options: self.options,
        })];
        if self.options.fix_root_html {
            transforms.push(Arc::new(RootHtmlFixup));
        }
        transforms
    }
}

static HTML: LazyLock<ExtensionRef> = LazyLock::new(|| Arc::new(HtmlInlay::new(HtmlOptions::default())));

/// The HTML extension. Default options give the shared instance; anything
/// else builds a fresh one.
pub fn html(options: HtmlOptions) -> ExtensionRef {
    if options == HtmlOptions::default() {
        HTML.clone()
    } else {
        Arc::new(HtmlInlay::new(options))
    }
}
