//! Bidirectional conversion between the external and editor trees.
//!
//! Both directions are post-order: a node's children are converted first and
//! the node's converter sees only those converted children. A converter may
//! return zero, one or many nodes, which are spliced into the parent's
//! children in place.

use log::trace;

use crate::editor::{EditorNode, Mark};
use crate::error::{ConvertError, Direction};
use crate::extension::{Composition, ConvertContext};
use crate::mdast::{ExternalNode, NodeKind};

/// Converts a whole external tree into an editor document.
///
/// The root must convert to exactly one node of the grammar's top type.
pub fn to_editor(
    composition: &Composition,
    root: &ExternalNode,
    cx: &mut ConvertContext,
) -> Result<EditorNode, ConvertError> {
    let mut converted = down(composition, root, cx)?;
    let top = composition.grammar().top_node().map(|t| t.name().to_string());
    match (converted.len(), &top) {
        (1, Some(top)) if converted[0].type_name() == top => Ok(converted.remove(0)),
        (count, _) => Err(ConvertError::RootMismatch {
            expected: top.unwrap_or_else(|| NodeKind::Root.to_string()),
            count,
        }),
    }
}

/// Converts a single external subtree, returning whatever its converter
/// produced.
pub fn down(
    composition: &Composition,
    node: &ExternalNode,
    cx: &mut ConvertContext,
) -> Result<Vec<EditorNode>, ConvertError> {
    let mut children = Vec::new();
    for child in node.children() {
        children.extend(down(composition, child, cx)?);
    }
    let ext = composition.down(&node.kind).ok_or_else(|| ConvertError::UnknownType {
        name: node.kind.to_string(),
        direction: Direction::Down,
    })?;
    trace!("down: {} via '{}' with {} children", node.kind, ext.name(), children.len());
    ext.to_editor(node, children, composition.grammar(), cx)
}

/// Converts an editor document back into an external tree rooted at `root`.
pub fn to_external(
    composition: &Composition,
    doc: &EditorNode,
    cx: &mut ConvertContext,
) -> Result<ExternalNode, ConvertError> {
    let mut converted = up(composition, doc, cx)?;
    match converted.len() {
        1 if converted[0].kind == NodeKind::Root => Ok(converted.remove(0)),
        count => Err(ConvertError::RootMismatch {
            expected: NodeKind::Root.to_string(),
            count,
        }),
    }
}

/// Converts a single editor subtree. Marks on the node itself are ignored;
/// they are applied by whoever converts its parent.
pub fn up(
    composition: &Composition,
    node: &EditorNode,
    cx: &mut ConvertContext,
) -> Result<Vec<ExternalNode>, ConvertError> {
    let children = up_marked(composition, node.content(), &[], cx)?;
    let ext = composition.up(node.type_name()).ok_or_else(|| ConvertError::UnknownType {
        name: node.type_name().to_string(),
        direction: Direction::Up,
    })?;
    trace!("up: {} via '{}' with {} children", node.type_name(), ext.name(), children.len());
    ext.to_external(node, children, composition.grammar(), cx)
}

/// Converts a run of siblings, rebuilding mark nesting.
///
/// `applied` holds the marks already wrapping this run. For each position the
/// pending mark of that node covering the longest run of adjacent siblings is
/// opened (ties go to the lowest rank), the run is converted recursively with
/// that mark applied, and the mark's converter wraps the result.
fn up_marked(
    composition: &Composition,
    nodes: &[EditorNode],
    applied: &[&Mark],
    cx: &mut ConvertContext,
) -> Result<Vec<ExternalNode>, ConvertError> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < nodes.len() {
        let pending = nodes[i].marks().iter().filter(|m| !applied.contains(m));
        let mut best: Option<(&Mark, usize)> = None;
        for mark in pending {
            let end = run_end(nodes, i, mark);
            if best.is_none_or(|(_, best_end)| end > best_end) {
                best = Some((mark, end));
            }
        }

        let Some((mark, end)) = best else {
            out.extend(up(composition, &nodes[i], cx)?);
            i += 1;
            continue;
        };

        let mut inner_applied = applied.to_vec();
        inner_applied.push(mark);
        let inner = up_marked(composition, &nodes[i..end], &inner_applied, cx)?;
        let ext = composition.up(mark.type_name()).ok_or_else(|| ConvertError::UnknownType {
            name: mark.type_name().to_string(),
            direction: Direction::Up,
        })?;
        out.extend(ext.mark_to_external(mark, inner, composition.grammar(), cx)?);
        i = end;
    }
    Ok(out)
}

/// One past the last sibling from `start` that carries `mark`.
fn run_end(nodes: &[EditorNode], start: usize, mark: &Mark) -> usize {
    nodes[start..]
        .iter()
        .position(|n| !n.marks().contains(mark))
        .map_or(nodes.len(), |offset| start + offset)
}
