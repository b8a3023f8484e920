//! Structural normalizer for budget outlines.
//!
//! # Responsibility
//! - Turn an arbitrarily ordered, arbitrarily parented node list into a
//!   consistent tree: dense order keys, valid levels, parents derived from
//!   document order and sequential outline codes.
//!
//! # Invariants
//! - Never fails; conflicting input is repaired towards the nearest valid
//!   structure (level jumps are capped, line item children are lifted).
//! - Runs exactly `NORMALIZE_PASSES` identical passes. Repairs in the first
//!   pass can change which node is the nearest preceding parent, and the
//!   second pass settles that for outlines up to `MAX_OUTLINE_LEVEL` deep.
//! - Running it on its own output changes nothing.
//!
//! # Leading line items
//! A line item can never sit at level 1. When the document starts with line
//! items there is no level-1 node for them to hang from, so they stay at
//! level 2 without a parent and get a `00` prefix segment (`00.01`).

use crate::model::outline_code::OutlineCode;
use crate::model::outline_node::{NodeId, NodeKind, OutlineNode};
use crate::outline::validate::check_invariants;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Number of full recomputation passes.
pub const NORMALIZE_PASSES: usize = 2;

/// Normalizes `nodes` in place and leaves them in final document order.
pub fn normalize(nodes: &mut [OutlineNode]) {
    let started_at = Instant::now();
    for _ in 0..NORMALIZE_PASSES {
        run_pass(nodes);
    }

    let violations = check_invariants(nodes);
    if violations.is_empty() {
        debug!(
            "event=outline_normalize module=normalize status=ok nodes={} passes={} duration_us={}",
            nodes.len(),
            NORMALIZE_PASSES,
            started_at.elapsed().as_micros()
        );
    } else {
        warn!(
            "event=outline_normalize module=normalize status=unsettled nodes={} passes={} violations={} first={:?}",
            nodes.len(),
            NORMALIZE_PASSES,
            violations.len(),
            violations[0]
        );
    }
}

fn run_pass(nodes: &mut [OutlineNode]) {
    nodes.sort_by(|a, b| a.sort_key.total_cmp(&b.sort_key));
    for (index, node) in nodes.iter_mut().enumerate() {
        node.sort_key = (index + 1) as f64;
    }

    let index_by_id: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id, index))
        .collect();

    detach_missing_parents(nodes, &index_by_id);
    repair_levels(nodes, &index_by_id);
    assign_parents_and_codes(nodes);
}

/// Treats references to nodes outside the list as root-level.
fn detach_missing_parents(nodes: &mut [OutlineNode], index_by_id: &HashMap<NodeId, usize>) {
    for node in nodes.iter_mut() {
        if let Some(parent_id) = node.parent_id {
            if !index_by_id.contains_key(&parent_id) {
                debug!(
                    "event=outline_repair module=normalize kind=missing_parent node={} parent={parent_id}",
                    node.id
                );
                node.parent_id = None;
            }
        }
    }
}

fn repair_levels(nodes: &mut [OutlineNode], index_by_id: &HashMap<NodeId, usize>) {
    for index in 0..nodes.len() {
        let is_line_item = nodes[index].kind.is_line_item();
        if is_line_item {
            if nodes[index].level < NodeKind::LineItem.min_level() {
                nodes[index].level = NodeKind::LineItem.min_level();
            }
            reattach_line_item_to_section(nodes, index, index_by_id);
        }

        let capped = match index.checked_sub(1) {
            None => nodes[index].kind.min_level(),
            Some(previous) => nodes[index]
                .level
                .clamp(1, nodes[previous].level.saturating_add(1)),
        };
        nodes[index].level = capped;

        // Children take the line item's final level, not the pre-cap one.
        if is_line_item {
            lift_children_of_line_item(nodes, index);
        }
    }
}

/// Moves every child of the line item at `index` up to the line item's own
/// parent and level.
fn lift_children_of_line_item(nodes: &mut [OutlineNode], index: usize) {
    let line_item_id = nodes[index].id;
    let new_parent = nodes[index].parent_id;
    let new_level = nodes[index].level;
    for node in nodes.iter_mut() {
        if node.parent_id == Some(line_item_id) {
            node.parent_id = new_parent;
            node.level = new_level;
        }
    }
}

/// Re-parents a line item nested under another line item to the nearest
/// section ancestor, or to the root when there is none.
fn reattach_line_item_to_section(
    nodes: &mut [OutlineNode],
    index: usize,
    index_by_id: &HashMap<NodeId, usize>,
) {
    let Some(parent_index) = nodes[index]
        .parent_id
        .and_then(|parent| index_by_id.get(&parent).copied())
    else {
        return;
    };
    if !nodes[parent_index].kind.is_line_item() {
        return;
    }

    let mut visited = HashSet::from([nodes[index].id]);
    let mut cursor = Some(parent_index);
    let mut section = None;
    while let Some(current) = cursor {
        if !visited.insert(nodes[current].id) {
            break;
        }
        if !nodes[current].kind.is_line_item() {
            section = Some(current);
            break;
        }
        cursor = nodes[current]
            .parent_id
            .and_then(|parent| index_by_id.get(&parent).copied());
    }

    nodes[index].parent_id = section.map(|section| nodes[section].id);
    nodes[index].level = section.map_or(NodeKind::LineItem.min_level(), |section| {
        nodes[section].level.saturating_add(1)
    });
}

/// Derives `parent_id` and `code` for every node from document order.
///
/// A node's parent is the nearest preceding node one level up; codes count
/// siblings sharing that parent and level, starting at 1. Levels get a final
/// settle in the same walk: at most one deeper than a preceding section and
/// never deeper than a preceding line item, so no line item becomes a parent.
fn assign_parents_and_codes(nodes: &mut [OutlineNode]) {
    let mut last_at_level: Vec<Option<usize>> = Vec::new();
    let mut sibling_counters: HashMap<(Option<usize>, u32), u32> = HashMap::new();

    for index in 0..nodes.len() {
        let level = settled_level(nodes, index);
        if level != nodes[index].level {
            debug!(
                "event=outline_repair module=normalize kind=level_settle node={} from={} to={level}",
                nodes[index].id, nodes[index].level
            );
            nodes[index].level = level;
        }
        let parent_index = if level > 1 {
            last_at_level
                .get((level - 1) as usize)
                .copied()
                .flatten()
        } else {
            None
        };

        let counter = sibling_counters.entry((parent_index, level)).or_insert(0);
        *counter += 1;
        let position = *counter;

        let parent_code = parent_index.and_then(|parent| nodes[parent].code.clone());
        nodes[index].code = Some(match parent_code {
            Some(parent_code) => parent_code.child(position),
            None => detached_code(level, position),
        });
        nodes[index].parent_id = parent_index.map(|parent| nodes[parent].id);

        let slot = level as usize;
        if last_at_level.len() <= slot {
            last_at_level.resize(slot + 1, None);
        }
        last_at_level[slot] = Some(index);
    }
}

/// Deepest level the node at `index` may take after its predecessor.
fn settled_level(nodes: &[OutlineNode], index: usize) -> u32 {
    let node = &nodes[index];
    let Some(previous) = index.checked_sub(1).map(|previous| &nodes[previous]) else {
        return node.kind.min_level();
    };
    let deepest = if previous.kind.is_line_item() {
        previous.level
    } else {
        previous.level.saturating_add(1)
    };
    node.level.clamp(node.kind.min_level(), deepest.max(node.kind.min_level()))
}

/// Code for a node with no parent: a plain counter at level 1, zero-filled
/// ancestor segments below that.
pub(crate) fn detached_code(level: u32, position: u32) -> OutlineCode {
    let mut code = OutlineCode::root(if level <= 1 { position } else { 0 });
    for depth in 2..=level.max(1) {
        code = code.child(if depth == level { position } else { 0 });
    }
    code
}

#[cfg(test)]
mod tests {
    use super::{detached_code, normalize};
    use crate::model::outline_node::{NodeId, NodeKind, OutlineNode};

    fn node(id: i64, kind: NodeKind, level: u32, sort_key: f64) -> OutlineNode {
        OutlineNode {
            id: NodeId::Stored(id),
            parent_id: None,
            kind,
            level,
            sort_key,
            code: None,
            label: String::new(),
            category_id: None,
            priced_detail: None,
        }
    }

    #[test]
    fn detached_code_pads_missing_ancestors_with_zero() {
        assert_eq!(detached_code(1, 3).to_string(), "03");
        assert_eq!(detached_code(2, 1).to_string(), "00.01");
        assert_eq!(detached_code(3, 2).to_string(), "00.00.02");
    }

    #[test]
    fn leading_line_item_stays_at_level_two_without_parent() {
        let mut nodes = vec![
            node(1, NodeKind::LineItem, 1, 1.0),
            node(2, NodeKind::Section, 1, 2.0),
            node(3, NodeKind::LineItem, 2, 3.0),
        ];
        normalize(&mut nodes);

        assert_eq!(nodes[0].level, 2);
        assert_eq!(nodes[0].parent_id, None);
        assert_eq!(nodes[0].code_text(), "00.01");
        assert_eq!(nodes[1].code_text(), "01");
        assert_eq!(nodes[2].parent_id, Some(NodeId::Stored(2)));
        assert_eq!(nodes[2].code_text(), "01.01");
    }

    #[test]
    fn extreme_loaded_levels_are_capped_without_overflow() {
        let mut nodes = vec![
            node(1, NodeKind::Section, 1, 1.0),
            node(2, NodeKind::LineItem, 2, 2.0),
            node(3, NodeKind::LineItem, u32::MAX, 3.0),
            node(4, NodeKind::Section, u32::MAX, 4.0),
        ];
        nodes[1].parent_id = Some(NodeId::Stored(3));
        nodes[2].parent_id = Some(NodeId::Stored(4));
        normalize(&mut nodes);

        let levels: Vec<u32> = nodes.iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![1, 2, 2, 2]);
        let codes: Vec<String> = nodes.iter().map(OutlineNode::code_text).collect();
        assert_eq!(codes, vec!["01", "01.01", "01.02", "01.03"]);
    }

    #[test]
    fn sort_keys_become_dense_in_document_order() {
        let mut nodes = vec![
            node(1, NodeKind::Section, 1, 40.0),
            node(2, NodeKind::Section, 1, 2.5),
            node(3, NodeKind::Section, 1, 10.0),
        ];
        normalize(&mut nodes);
        let order: Vec<_> = nodes.iter().map(|n| (n.id, n.sort_key)).collect();
        assert_eq!(
            order,
            vec![
                (NodeId::Stored(2), 1.0),
                (NodeId::Stored(3), 2.0),
                (NodeId::Stored(1), 3.0),
            ]
        );
    }
}
