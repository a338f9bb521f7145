//! Flat, index-addressed copy of an external tree.
//!
//! Slots are stored in pre-order, so slot order is document order. Passes
//! edit slots (retype, revalue, mark removed) and then rebuild a fresh tree;
//! a removed slot drops its whole subtree from the rebuilt output.

use super::ExternalNode;
use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(usize);

#[cfg(test)]
impl NodeId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug)]
pub(crate) struct Slot {
    /// The node itself, with `children` taken out.
    pub node: ExternalNode,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Whether the original node had a children list at all (vs. a leaf).
    pub is_parent: bool,
    pub removed: bool,
}

#[derive(Debug)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    pub fn from_tree(root: ExternalNode) -> Self {
        let mut arena = Arena { slots: Vec::new() };
        arena.push(root, None);
        arena
    }

    fn push(&mut self, mut node: ExternalNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.slots.len());
        let children = node.children.take();
        self.slots.push(Slot {
            node,
            parent,
            children: Vec::new(),
            is_parent: children.is_some(),
            removed: false,
        });
        for child in children.into_iter().flatten() {
            let child_id = self.push(child, Some(id));
            self.slots[id.0].children.push(child_id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// All ids in document (pre-order) order, removed ones included.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.slots.len()).map(NodeId)
    }

    /// Ids from `first` to `last` inclusive, in document order.
    pub fn range(&self, first: NodeId, last: NodeId) -> impl Iterator<Item = NodeId> + use<> {
        (first.0..=last.0).map(NodeId)
    }

    pub fn get(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.0]
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.slots[id.0].node.position
    }

    /// True if the slot or any of its ancestors has been removed.
    pub fn is_removed(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let slot = &self.slots[current.0];
            if slot.removed {
                return true;
            }
            cursor = slot.parent;
        }
        false
    }

    pub fn remove(&mut self, id: NodeId) {
        self.slots[id.0].removed = true;
    }

    /// Rebuilds an owned tree, skipping removed subtrees. A removed root
    /// yields an empty copy of itself so callers always get a tree back.
    pub fn into_tree(mut self) -> ExternalNode {
        let root = self.root();
        self.slots[root.0].removed = false;
        self.build(root)
    }

    fn build(&mut self, id: NodeId) -> ExternalNode {
        let child_ids = std::mem::take(&mut self.slots[id.0].children);
        let mut children = Vec::with_capacity(child_ids.len());
        for child in child_ids {
            if !self.slots[child.0].removed {
                children.push(self.build(child));
            }
        }
        let slot = &mut self.slots[id.0];
        let placeholder = ExternalNode::void(slot.node.kind.clone());
        let mut node = std::mem::replace(&mut slot.node, placeholder);
        if slot.is_parent {
            node.children = Some(children);
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdast::NodeKind;
    use pretty_assertions::assert_eq;

    fn sample() -> ExternalNode {
        ExternalNode::parent(
            NodeKind::Root,
            vec![
                ExternalNode::parent(
                    NodeKind::Paragraph,
                    vec![ExternalNode::text("a").at(0, 1), ExternalNode::text("b").at(1, 2)],
                )
                .at(0, 2),
                ExternalNode::void(NodeKind::ThematicBreak).at(3, 6),
            ],
        )
        .at(0, 6)
    }

    #[test]
    fn untouched_arena_rebuilds_identical_tree() {
        let tree = sample();
        let rebuilt = Arena::from_tree(tree.clone()).into_tree();
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn ids_follow_document_order() {
        let arena = Arena::from_tree(sample());
        let kinds: Vec<String> = arena
            .ids()
            .map(|id| arena.get(id).node.kind.to_string())
            .collect();
        assert_eq!(kinds, ["root", "paragraph", "text", "text", "thematicBreak"]);
    }

    #[test]
    fn removed_subtree_disappears() {
        let mut arena = Arena::from_tree(sample());
        let paragraph = arena.ids().nth(1).unwrap();
        let inner = arena.ids().nth(2).unwrap();
        arena.remove(paragraph);
        assert!(arena.is_removed(inner));
        let rebuilt = arena.into_tree();
        assert_eq!(rebuilt.children().len(), 1);
        assert_eq!(rebuilt.children()[0].kind, NodeKind::ThematicBreak);
    }

    #[test]
    fn leaf_stays_leaf_and_empty_parent_stays_parent() {
        let tree = ExternalNode::parent(
            NodeKind::Root,
            vec![ExternalNode::parent(NodeKind::Paragraph, vec![ExternalNode::text("x")])],
        );
        let mut arena = Arena::from_tree(tree);
        let text = arena.ids().nth(2).unwrap();
        arena.remove(text);
        let rebuilt = arena.into_tree();
        assert_eq!(rebuilt.children()[0].children, Some(vec![]));
    }
}
