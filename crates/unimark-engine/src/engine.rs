use log::debug;

use crate::convert;
use crate::editor::{EditorNode, Grammar};
use crate::error::Result;
use crate::extension::{AuxBindings, Composition, ConvertContext, ExtensionRef, compose};
use crate::mdast::{self, ExternalNode};

/// One composed set of extensions and the full markdown pipeline over it.
///
/// Composition happens once in [`Engine::new`]; every conversion afterwards
/// only reads it, so an engine can be shared across threads.
#[derive(Debug)]
pub struct Engine {
    composition: Composition,
}

impl Engine {
    pub fn new(requested: &[ExtensionRef]) -> Result<Self> {
        let composition = compose(requested)?;
        Ok(Self { composition })
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn grammar(&self) -> &Grammar {
        self.composition.grammar()
    }

    pub fn bindings(&self) -> &AuxBindings {
        self.composition.bindings()
    }

    /// Parses markdown and runs every composed transform, in order.
    pub fn parse_external(&self, source: &str) -> Result<ExternalNode> {
        let mut tree = mdast::parse(source);
        for transform in self.composition.transforms() {
            debug!("Running transform '{}'", transform.name());
            tree = transform.apply(tree)?;
        }
        Ok(tree)
    }

    /// Markdown source to editor document.
    pub fn parse(&self, source: &str) -> Result<EditorNode> {
        let tree = self.parse_external(source)?;
        self.to_editor(&tree)
    }

    /// Converts an external tree as-is, without running transforms.
    pub fn to_editor(&self, tree: &ExternalNode) -> Result<EditorNode> {
        let mut cx = ConvertContext::new();
        Ok(convert::to_editor(&self.composition, tree, &mut cx)?)
    }

    pub fn to_external(&self, doc: &EditorNode) -> Result<ExternalNode> {
        let mut cx = ConvertContext::new();
        Ok(convert::to_external(&self.composition, doc, &mut cx)?)
    }

    /// Editor document back to markdown source.
    pub fn serialize(&self, doc: &EditorNode) -> Result<String> {
        let tree = self.to_external(doc)?;
        Ok(mdast::serialize(&tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{gfm, html::html, markdown};
    use crate::error::{ConvertError, Direction, EngineError};
    use crate::reconcile::HtmlOptions;

    fn engine() -> Engine {
        Engine::new(&[gfm(), html(HtmlOptions::default())]).unwrap()
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn engine_is_shareable() {
        assert_send_sync::<Engine>();
    }

    #[test]
    fn parses_into_document() {
        let doc = engine().parse("# Title\n\nSome *text*.\n").unwrap();
        assert_eq!(doc.type_name(), "doc");
        assert_eq!(doc.content()[0].type_name(), "heading");
        assert_eq!(doc.content()[1].content()[1].marks()[0].type_name(), "em");
    }

    #[test]
    fn html_without_extension_is_unknown() {
        let engine = Engine::new(&[markdown()]).unwrap();
        let err = engine.parse("a <b>x</b>\n").unwrap_err();
        assert_eq!(
            err,
            EngineError::Convert(ConvertError::UnknownType {
                name: "html".into(),
                direction: Direction::Down
            })
        );
    }

    #[test]
    fn transforms_run_before_conversion() {
        let tree = engine().parse_external("<div>\n\n*x*\n\n</div>\n").unwrap();
        assert_eq!(tree.children().len(), 1);
        let paragraph = &tree.children()[0];
        assert_eq!(paragraph.kind, mdast::NodeKind::Paragraph);
        assert_eq!(paragraph.children()[0].value.as_deref(), Some("<div>x</div>"));
    }

    #[test]
    fn serialize_regenerates_markdown() {
        let engine = engine();
        let doc = engine.parse("Hello **world**\n").unwrap();
        assert_eq!(engine.serialize(&doc).unwrap(), "Hello **world**\n");
    }
}
