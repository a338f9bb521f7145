use std::collections::HashMap;

use log::debug;

use super::HtmlOptions;
use super::classify::{Flow, FlowKind, classify, is_void_element};
use crate::error::ReconcileError;
use crate::mdast::arena::{Arena, NodeId};
use crate::mdast::{ExternalNode, NodeKind};
use crate::position::Position;

/// Re-pairs HTML tags that the parser split into separate literals.
///
/// Flow literals are collected in document order. Each opening tag is paired
/// with the nearest later closing tag of the same name; there is no nesting
/// stack, so `<b><b></b></b>` pairs the first `<b>` with the first `</b>`.
/// The pair and everything between them collapse into the opening node,
/// which becomes one `html` literal spanning the whole range. Ancestors of
/// the opening node are widened to cover it. Nodes without a position never
/// take part.
pub fn reconcile(tree: ExternalNode, options: &HtmlOptions) -> Result<ExternalNode, ReconcileError> {
    let mut arena = Arena::from_tree(tree);
    let flows = collect_flows(&arena)?;
    let next_close = next_closing(&flows);

    let mut merged = 0;
    let mut i = 0;
    while i < flows.len() {
        let (open, flow) = &flows[i];
        let tag = match (&flow.kind, &flow.tag) {
            (FlowKind::Opening, Some(tag)) if !arena.is_removed(*open) => tag,
            _ => {
                i += 1;
                continue;
            }
        };
        if options.skip_void_elements && is_void_element(tag) {
            i += 1;
            continue;
        }
        let Some(j) = next_close[i] else {
            i += 1;
            continue;
        };

        merge(&mut arena, *open, flows[j].0);
        merged += 1;
        i = j + 1;
    }

    if merged > 0 {
        debug!("Reconciled {merged} HTML tag pairs");
    }
    Ok(arena.into_tree())
}

fn collect_flows(arena: &Arena) -> Result<Vec<(NodeId, Flow)>, ReconcileError> {
    let mut flows = Vec::new();
    for id in arena.ids() {
        let node = &arena.get(id).node;
        if node.kind != NodeKind::Html || node.position.is_none() {
            continue;
        }
        let Some(value) = node.value.as_deref() else {
            continue;
        };
        if let Some(flow) = classify(value).map_err(|e| e.with_position(node.position))? {
            flows.push((id, flow));
        }
    }
    Ok(flows)
}

/// For each flow, the index of the nearest later closing flow with the same
/// tag name. Filled right to left in one pass.
fn next_closing(flows: &[(NodeId, Flow)]) -> Vec<Option<usize>> {
    let mut next = vec![None; flows.len()];
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, (_, flow)) in flows.iter().enumerate().rev() {
        let Some(tag) = flow.tag.as_deref() else {
            continue;
        };
        next[i] = seen.get(tag).copied();
        if flow.kind == FlowKind::Closing {
            seen.insert(tag, i);
        }
    }
    next
}

/// Collapses `open..=close` into the opening node.
///
/// Slots are in pre-order and positions never decrease along it, so every
/// node inside the merged range sits between the two ids.
fn merge(arena: &mut Arena, open: NodeId, close: NodeId) {
    let (Some(open_pos), Some(close_pos)) = (arena.position(open), arena.position(close)) else {
        return;
    };
    let range = Position::new(open_pos.start, close_pos.end);

    let mut value = String::new();
    for id in arena.range(open, close) {
        if arena.is_removed(id) {
            continue;
        }
        let node = &arena.get(id).node;
        if let (Some(pos), Some(literal)) = (node.position, node.value.as_deref())
            && pos.between(range)
        {
            value.push_str(literal);
        }
    }

    for id in arena.range(open, close) {
        if id == open {
            continue;
        }
        if let Some(pos) = arena.position(id)
            && pos.start >= open_pos.end
            && pos.end <= close_pos.end
        {
            arena.remove(id);
        }
    }

    debug!("Merged HTML {}..{} into '{value}'", range.start, range.end);
    let node = &mut arena.get_mut(open).node;
    node.kind = NodeKind::Html;
    node.value = Some(value);
    node.position = Some(range);

    let mut cursor = arena.get(open).parent;
    while let Some(id) = cursor {
        let slot = arena.get_mut(id);
        if let Some(pos) = slot.node.position {
            slot.node.position = Some(pos.cover(range));
        }
        cursor = slot.parent;
    }
}
