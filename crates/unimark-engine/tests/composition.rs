use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use unimark_engine::catalog::{Command, block, gfm, html::html, inline, markdown};
use unimark_engine::{Composition, ConfigurationError, Extension, ExtensionRef, HtmlOptions, NodeKind, Payload, compose};

fn summary(comp: &Composition) -> (Vec<String>, Vec<String>, Vec<String>, Vec<String>) {
    (
        comp.extensions().iter().map(|e| e.name().to_string()).collect(),
        comp.grammar().node_types().map(|n| n.name().to_string()).collect(),
        comp.grammar().mark_types().map(|m| m.name().to_string()).collect(),
        comp.bindings().keys().map(str::to_string).collect(),
    )
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

#[test]
fn composing_twice_gives_the_same_result() {
    let requested = [gfm(), html(HtmlOptions::default())];
    let first = compose(&requested).unwrap();
    let second = compose(&requested).unwrap();
    assert_eq!(summary(&first), summary(&second));
    assert_eq!(first.down_kinds(), second.down_kinds());
    assert_eq!(first.up_types(), second.up_types());
}

#[test]
fn requesting_a_dependency_explicitly_changes_nothing() {
    let implicit = compose(&[block::paragraph()]).unwrap();
    let explicit = compose(&[inline::text(), block::paragraph()]).unwrap();
    assert_eq!(sorted(summary(&implicit).0), sorted(summary(&explicit).0));
    assert_eq!(implicit.up_types(), explicit.up_types());

    let once = compose(&[gfm()]).unwrap();
    let twice = compose(&[gfm(), markdown(), gfm()]).unwrap();
    assert_eq!(summary(&once), summary(&twice));
}

#[test]
fn gfm_covers_every_commonmark_type() {
    let comp = compose(&[gfm()]).unwrap();
    assert_eq!(comp.grammar().top_node().map(|n| n.name()), Some("doc"));
    assert_eq!(
        comp.up_types(),
        [
            "blockquote",
            "code",
            "code_block",
            "doc",
            "em",
            "hard_break",
            "heading",
            "horizontal_rule",
            "image",
            "link",
            "list",
            "list_item",
            "paragraph",
            "strikethrough",
            "strong",
            "table",
            "table_cell",
            "table_row",
            "text",
        ]
    );
    assert!(comp.down(&NodeKind::Html).is_none());
    assert!(comp.transforms().is_empty());
}

#[test]
fn two_html_configurations_collide() {
    let strict = HtmlOptions {
        skip_void_elements: true,
        ..HtmlOptions::default()
    };
    let err = compose(&[markdown(), html(HtmlOptions::default()), html(strict)]).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::DuplicateEditorType {
            name: "html".into(),
            first: "html".into(),
            second: "html".into(),
        }
    );
}

/// Claims an external kind without converting anything up.
struct Shadow {
    kind: NodeKind,
}

impl Extension for Shadow {
    fn name(&self) -> &str {
        "shadow"
    }

    fn external_kind(&self) -> Option<NodeKind> {
        Some(self.kind.clone())
    }
}

#[test]
fn second_claim_on_an_external_kind_is_rejected() {
    let shadow: ExtensionRef = Arc::new(Shadow {
        kind: NodeKind::Paragraph,
    });
    let err = compose(&[markdown(), shadow]).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::DuplicateExternalType {
            kind: NodeKind::Paragraph,
            first: "paragraph".into(),
            second: "shadow".into(),
        }
    );
}

/// An extension whose dependencies are wired after construction.
struct Node {
    name: &'static str,
    deps: Mutex<Vec<ExtensionRef>>,
}

impl Node {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            deps: Mutex::new(Vec::new()),
        })
    }

    fn depends_on(&self, dep: ExtensionRef) {
        if let Ok(mut deps) = self.deps.lock() {
            deps.push(dep);
        }
    }
}

impl Extension for Node {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        self.deps.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[test]
fn cycles_through_catalog_requests_are_reported() {
    let outer = Node::new("outer");
    let inner = Node::new("inner");
    outer.depends_on(markdown());
    outer.depends_on(inner.clone());
    inner.depends_on(outer.clone());

    let err = compose(&[outer as ExtensionRef]).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::DependencyCycle {
            cycle: vec!["outer".into(), "inner".into(), "outer".into()]
        }
    );
    assert_eq!(err.to_string(), "Extension dependency cycle: outer -> inner -> outer");
}

/// Binds a key that the catalog binds too.
struct Override;

impl Extension for Override {
    fn name(&self) -> &str {
        "override"
    }

    fn keymap(&self) -> Vec<(String, Payload)> {
        vec![("Mod-b".into(), Arc::new("custom bold") as Payload)]
    }
}

#[test]
fn earlier_key_bindings_win() {
    let first = compose(&[Arc::new(Override) as ExtensionRef, gfm()]).unwrap();
    let payload = first.bindings().key("Mod-b").unwrap();
    assert_eq!(payload.downcast_ref::<&'static str>(), Some(&"custom bold"));

    let last = compose(&[gfm(), Arc::new(Override) as ExtensionRef]).unwrap();
    let payload = last.bindings().key("Mod-b").unwrap();
    assert_eq!(payload.downcast_ref::<Command>(), Some(&Command::ToggleMark("strong")));
}

#[test]
fn html_contributes_its_transforms_once() {
    let comp = compose(&[html(HtmlOptions::default()), gfm(), html(HtmlOptions::default())]).unwrap();
    let names: Vec<&str> = comp.transforms().iter().map(|t| t.name()).collect();
    assert_eq!(names, ["html-reconcile", "root-html-fixup"]);
}
