use pretty_assertions::assert_eq;
use rstest::rstest;
use unimark_engine::catalog::{gfm, html::html};
use unimark_engine::reconcile::{HtmlReconcile, RootHtmlFixup};
use unimark_engine::{Engine, EngineError, ExternalNode, HtmlOptions, NodeKind, Position, ReconcileError, TreeTransform};

fn engine_with(options: HtmlOptions) -> Engine {
    Engine::new(&[gfm(), html(options)]).unwrap()
}

fn html_values(node: &ExternalNode, out: &mut Vec<String>) {
    if node.kind == NodeKind::Html
        && let Some(value) = &node.value
    {
        out.push(value.clone());
    }
    for child in node.children() {
        html_values(child, out);
    }
}

fn all_html(tree: &ExternalNode) -> Vec<String> {
    let mut out = Vec::new();
    html_values(tree, &mut out);
    out
}

#[rstest]
#[case("a <b>x</b> c\n", &["<b>x</b>"])]
#[case("a <b>x c\n", &["<b>"])]
#[case("<i>one</i> and <i>two</i>\n", &["<i>one</i>", "<i>two</i>"])]
#[case("<span>a <em>b</em> c</span>\n", &["<span>a <em>b</em> c</span>"])]
#[case("x <!-- note --> y\n", &["<!-- note -->"])]
#[case("<div>\n\nInside *here*.\n\n</div>\n", &["<div>Inside here.</div>"])]
fn parsed_html_is_reconciled(#[case] source: &str, #[case] expected: &[&str]) {
    let tree = engine_with(HtmlOptions::default()).parse_external(source).unwrap();
    assert_eq!(all_html(&tree), expected);
}

#[test]
fn merged_node_spans_the_whole_pair() {
    let tree = engine_with(HtmlOptions::default())
        .parse_external("a <b>x</b> c\n")
        .unwrap();
    let paragraph = &tree.children()[0];
    assert_eq!(paragraph.children().len(), 3);
    assert_eq!(paragraph.children()[1].position, Some(Position::new(2, 10)));
    assert_eq!(paragraph.children()[2].value.as_deref(), Some(" c"));
}

#[rstest]
#[case("<span>a\n\nb</span> c\n", "<span>ab</span>", Position::new(0, 17), " c")]
#[case("<em>one\n\ntwo</em> three\n", "<em>onetwo</em>", Position::new(0, 17), " three")]
fn pair_across_paragraphs_keeps_the_tail(
    #[case] source: &str,
    #[case] merged: &str,
    #[case] merged_at: Position,
    #[case] tail: &str,
) {
    let tree = engine_with(HtmlOptions::default()).parse_external(source).unwrap();
    let [first, second] = tree.children() else {
        panic!("expected two paragraphs, got {:?}", tree.children());
    };

    assert_eq!(first.children().len(), 1);
    assert_eq!(first.children()[0].value.as_deref(), Some(merged));
    assert_eq!(first.children()[0].position, Some(merged_at));
    assert_eq!(first.position, Some(merged_at));

    assert_eq!(second.kind, NodeKind::Paragraph);
    assert_eq!(second.children().len(), 1);
    assert_eq!(second.children()[0].value.as_deref(), Some(tail));
}

#[test]
fn block_html_lands_in_a_paragraph() {
    let tree = engine_with(HtmlOptions::default())
        .parse_external("<div>\n\nInside.\n\n</div>\n")
        .unwrap();
    assert_eq!(tree.children().len(), 1);
    assert_eq!(tree.children()[0].kind, NodeKind::Paragraph);
    assert_eq!(tree.children()[0].position, Some(Position::new(0, 22)));
}

#[test]
fn fixup_can_be_disabled() {
    let options = HtmlOptions {
        fix_root_html: false,
        ..HtmlOptions::default()
    };
    let tree = engine_with(options).parse_external("<hr class=\"x\">\n").unwrap();
    assert_eq!(tree.children()[0].kind, NodeKind::Html);
}

#[test]
fn skipping_void_elements_changes_br_pairing() {
    let source = "one <br> two </br> three\n";
    let paired = engine_with(HtmlOptions::default()).parse_external(source).unwrap();
    assert_eq!(all_html(&paired), ["<br> two </br>"]);

    let options = HtmlOptions {
        skip_void_elements: true,
        ..HtmlOptions::default()
    };
    let skipped = engine_with(options).parse_external(source).unwrap();
    assert_eq!(all_html(&skipped), ["<br>", "</br>"]);
}

#[test]
fn reconciled_html_becomes_an_editor_atom() {
    let doc = engine_with(HtmlOptions::default())
        .parse("Press <kbd>Ctrl</kbd> now.\n")
        .unwrap();
    let paragraph = &doc.content()[0];
    let names: Vec<&str> = paragraph.content().iter().map(|n| n.type_name()).collect();
    assert_eq!(names, ["text", "html", "text"]);
    assert_eq!(paragraph.content()[1].text_content(), "<kbd>Ctrl</kbd>");
}

#[test]
fn malformed_tag_surfaces_as_engine_error() {
    let tree = ExternalNode::parent(
        NodeKind::Root,
        vec![ExternalNode::parent(NodeKind::Paragraph, vec![ExternalNode::html("< oops>").at(3, 10)]).at(0, 10)],
    )
    .at(0, 10);
    let err = HtmlReconcile::default().apply(tree).unwrap_err();
    assert_eq!(
        err,
        EngineError::Reconcile(ReconcileError::MalformedFragment {
            value: "< oops>".into(),
            position: Some(Position::new(3, 10)),
        })
    );
}

#[test]
fn transforms_compose_in_order() {
    let tree = ExternalNode::parent(
        NodeKind::Root,
        vec![
            ExternalNode::html("<div>").at(0, 5),
            ExternalNode::parent(NodeKind::Paragraph, vec![ExternalNode::text("x").at(7, 8)]).at(7, 8),
            ExternalNode::html("</div>").at(10, 16),
        ],
    )
    .at(0, 16);
    let merged = HtmlReconcile::default().apply(tree).unwrap();
    let fixed = RootHtmlFixup.apply(merged).unwrap();

    let expected = ExternalNode::parent(
        NodeKind::Root,
        vec![ExternalNode::parent(NodeKind::Paragraph, vec![ExternalNode::html("<div>x</div>").at(0, 16)]).at(0, 16)],
    )
    .at(0, 16);
    assert_eq!(fixed, expected);
}
