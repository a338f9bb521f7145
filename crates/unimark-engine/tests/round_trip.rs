use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use unimark_engine::catalog::{gfm, html::html};
use unimark_engine::editor::{Attrs, EditorNode, Grammar, GrammarFragment, NodeSpec};
use unimark_engine::{
    ConvertContext, ConvertError, Engine, EngineError, Extension, ExtensionRef, ExternalNode, HtmlOptions, NodeKind,
};

fn engine() -> Engine {
    Engine::new(&[gfm(), html(HtmlOptions::default())]).unwrap()
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("{}/tests/fixtures/{name}.md", env!("CARGO_MANIFEST_DIR"))).unwrap()
}

#[rstest]
#[case("basic")]
#[case("marks")]
#[case("lists")]
#[case("html")]
#[case("tables")]
fn fixture_round_trips_structurally(#[case] name: &str) {
    let engine = engine();
    let source = read_fixture(name);

    let tree = engine.parse_external(&source).unwrap();
    let doc = engine.to_editor(&tree).unwrap();

    let up = engine.to_external(&doc).unwrap();
    assert_eq!(up.shape(), tree.shape(), "up-converted tree of {name}");

    let regenerated = engine.serialize(&doc).unwrap();
    let reparsed = engine.parse_external(&regenerated).unwrap();
    assert_eq!(reparsed.shape(), tree.shape(), "reparsed output of {name}:\n{regenerated}");
}

#[test]
fn serialized_marks_keep_their_nesting() {
    let engine = engine();
    let doc = engine.parse("Some *a **b*** text.\n").unwrap();
    assert_eq!(engine.serialize(&doc).unwrap(), "Some *a **b*** text.\n");
}

#[test]
fn unknown_type_aborts_without_output() {
    let engine = engine();
    let tree = ExternalNode::parent(
        NodeKind::Root,
        vec![
            ExternalNode::parent(NodeKind::Paragraph, vec![ExternalNode::text("fine")]),
            ExternalNode::void("wikiLink"),
        ],
    );
    let err = engine.to_editor(&tree).unwrap_err();
    assert_eq!(err.to_string(), "No converter registered for type 'wikiLink' (external -> editor)");
}

#[test]
fn root_must_convert_to_the_top_node() {
    let engine = engine();
    let not_a_root = ExternalNode::parent(NodeKind::Paragraph, vec![ExternalNode::text("x")]);
    let err = engine.to_editor(&not_a_root).unwrap_err();
    assert_eq!(
        err,
        EngineError::Convert(ConvertError::RootMismatch {
            expected: "doc".into(),
            count: 1
        })
    );
}

/// Converts any node kind to an editor node of the same name and back,
/// keeping children untouched.
struct Passthrough {
    kind: NodeKind,
    deps: Vec<ExtensionRef>,
}

impl Extension for Passthrough {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(self.kind.clone())
    }

    fn editor_type(&self) -> Option<&str> {
        Some(self.kind.as_str())
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        let spec = if self.kind == NodeKind::Text {
            NodeSpec::leaf()
        } else {
            NodeSpec::with_content("any*")
        };
        Some(GrammarFragment::Node(spec.group("any")))
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        self.deps.clone()
    }

    fn to_editor(
        &self,
        node: &ExternalNode,
        children: Vec<EditorNode>,
        grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        match &node.value {
            Some(value) => Ok(vec![grammar.text(value.clone(), vec![])?]),
            None => Ok(vec![grammar.node(self.kind.as_str(), Attrs::new(), children)?]),
        }
    }

    fn to_external(
        &self,
        node: &EditorNode,
        children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        match node.text() {
            Some(text) => Ok(vec![ExternalNode::text(text)]),
            None => Ok(vec![ExternalNode::parent(self.kind.clone(), children)]),
        }
    }
}

#[test]
fn identity_converters_round_trip_structure() {
    let leaf = |kind: NodeKind| -> ExtensionRef { Arc::new(Passthrough { kind, deps: vec![] }) };
    let text = leaf(NodeKind::Text);
    let section = leaf(NodeKind::from("section"));
    let root: ExtensionRef = Arc::new(Passthrough {
        kind: NodeKind::Root,
        deps: vec![section, text],
    });
    let engine = Engine::new(&[root]).unwrap();

    let tree = ExternalNode::parent(
        NodeKind::Root,
        vec![
            ExternalNode::parent("section", vec![ExternalNode::text("a"), ExternalNode::text("b")]),
            ExternalNode::parent(
                "section",
                vec![ExternalNode::parent("section", vec![]), ExternalNode::text("c")],
            ),
        ],
    );
    let doc = engine.to_editor(&tree).unwrap();
    assert_eq!(doc.node_count(), 7);
    let back = engine.to_external(&doc).unwrap();
    assert_eq!(back.shape(), tree.shape());
    assert_eq!(back, tree);
}
