//! Read-only tree projections of a flat outline.
//!
//! # Responsibility
//! - Build the nested parent/children view for display.
//! - Filter the flat list by collapsed ancestors.
//!
//! # Invariants
//! - Pure derivations, recomputed on every read; the flat list stays the
//!   source of truth.
//! - Siblings are ordered by `sort_key`.
//! - Parent cycles in unnormalized input are cut instead of recursing.

use crate::model::outline_node::{NodeId, OutlineNode};
use std::collections::HashSet;

/// One node with its ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<'a> {
    pub node: &'a OutlineNode,
    pub children: Vec<TreeNode<'a>>,
}

/// Builds the ordered subtree under `parent_id` (`None` for the whole tree).
pub fn build_tree(nodes: &[OutlineNode], parent_id: Option<NodeId>) -> Vec<TreeNode<'_>> {
    let mut path = Vec::new();
    build_level(nodes, parent_id, &mut path)
}

fn build_level<'a>(
    nodes: &'a [OutlineNode],
    parent_id: Option<NodeId>,
    path: &mut Vec<NodeId>,
) -> Vec<TreeNode<'a>> {
    let mut children: Vec<&OutlineNode> = nodes
        .iter()
        .filter(|node| node.parent_id == parent_id && !path.contains(&node.id))
        .collect();
    children.sort_by(|a, b| a.sort_key.total_cmp(&b.sort_key));

    children
        .into_iter()
        .map(|node| {
            path.push(node.id);
            let grandchildren = build_level(nodes, Some(node.id), path);
            path.pop();
            TreeNode {
                node,
                children: grandchildren,
            }
        })
        .collect()
}

/// Returns whether any node names `id` as its parent.
pub fn has_children(nodes: &[OutlineNode], id: NodeId) -> bool {
    nodes.iter().any(|node| node.parent_id == Some(id))
}

/// Returns nodes in `sort_key` order, skipping every node that has a
/// collapsed ancestor. Collapsed nodes themselves stay visible.
pub fn visible_nodes<'a>(
    nodes: &'a [OutlineNode],
    collapsed: &HashSet<NodeId>,
) -> Vec<&'a OutlineNode> {
    let mut ordered: Vec<&OutlineNode> = nodes.iter().collect();
    ordered.sort_by(|a, b| a.sort_key.total_cmp(&b.sort_key));
    if collapsed.is_empty() {
        return ordered;
    }

    ordered
        .into_iter()
        .filter(|node| !has_collapsed_ancestor(nodes, node, collapsed))
        .collect()
}

fn has_collapsed_ancestor(
    nodes: &[OutlineNode],
    node: &OutlineNode,
    collapsed: &HashSet<NodeId>,
) -> bool {
    let mut visited = HashSet::from([node.id]);
    let mut cursor = node.parent_id;
    while let Some(current) = cursor {
        if collapsed.contains(&current) {
            return true;
        }
        if !visited.insert(current) {
            return false;
        }
        cursor = nodes
            .iter()
            .find(|candidate| candidate.id == current)
            .and_then(|parent| parent.parent_id);
    }
    false
}
