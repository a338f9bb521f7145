use log::debug;

use crate::mdast::{ExternalNode, NodeKind};

/// Wraps every `html` node whose parent does not hold phrasing content in a
/// new paragraph that takes over the literal's position.
pub fn fix_root_html(tree: ExternalNode) -> ExternalNode {
    let mut wrapped = 0;
    let fixed = fix(tree, &mut wrapped);
    if wrapped > 0 {
        debug!("Wrapped {wrapped} HTML nodes in paragraphs");
    }
    fixed
}

fn fix(mut node: ExternalNode, wrapped: &mut usize) -> ExternalNode {
    let Some(children) = node.children.take() else {
        return node;
    };
    let inline_parent = node.kind.holds_phrasing();
    let children = children
        .into_iter()
        .map(|child| {
            let child = fix(child, wrapped);
            if child.kind == NodeKind::Html && !inline_parent {
                *wrapped += 1;
                let position = child.position;
                let mut paragraph = ExternalNode::parent(NodeKind::Paragraph, vec![child]);
                paragraph.position = position;
                paragraph
            } else {
                child
            }
        })
        .collect();
    node.children = Some(children);
    node
}
