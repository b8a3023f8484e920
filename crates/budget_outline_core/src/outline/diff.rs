//! Change-set differ between a normalized outline and its pre-edit snapshot.
//!
//! # Responsibility
//! - Emit the minimal set of node writes needed to persist a normalized
//!   outline.
//!
//! # Invariants
//! - Nodes without a snapshot entry are creates; nodes whose structural
//!   fields changed are updates; snapshot nodes that disappeared are deletes.
//! - Upserts keep document order so parents precede their children; deletes
//!   follow all upserts.
//! - An unchanged outline yields an empty change set.

use crate::model::outline_node::{structurally_equal, NodeId, OutlineNode, StoredId};
use std::collections::{HashMap, HashSet};

/// One write for the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    /// Node never persisted before.
    Create(OutlineNode),
    /// Persisted node whose level, code or parent changed.
    Update(OutlineNode),
    /// Persisted node removed from the outline.
    Delete(StoredId),
}

impl NodeChange {
    /// Id of the node this change concerns.
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Create(node) | Self::Update(node) => node.id,
            Self::Delete(id) => NodeId::Stored(*id),
        }
    }
}

/// Ordered list of writes produced by `diff`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub changes: Vec<NodeChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn creates(&self) -> impl Iterator<Item = &OutlineNode> {
        self.changes.iter().filter_map(|change| match change {
            NodeChange::Create(node) => Some(node),
            _ => None,
        })
    }

    pub fn updates(&self) -> impl Iterator<Item = &OutlineNode> {
        self.changes.iter().filter_map(|change| match change {
            NodeChange::Update(node) => Some(node),
            _ => None,
        })
    }

    pub fn deletions(&self) -> impl Iterator<Item = StoredId> + '_ {
        self.changes.iter().filter_map(|change| match change {
            NodeChange::Delete(id) => Some(*id),
            _ => None,
        })
    }
}

/// Compares `normalized` against `snapshot` and returns the writes needed.
pub fn diff(snapshot: &[OutlineNode], normalized: &[OutlineNode]) -> ChangeSet {
    let before: HashMap<NodeId, &OutlineNode> =
        snapshot.iter().map(|node| (node.id, node)).collect();

    let mut changes = Vec::new();
    for node in normalized {
        match before.get(&node.id) {
            None => changes.push(NodeChange::Create(node.clone())),
            Some(previous) if !structurally_equal(previous, node) => {
                changes.push(NodeChange::Update(node.clone()));
            }
            Some(_) => {}
        }
    }

    let remaining: HashSet<NodeId> = normalized.iter().map(|node| node.id).collect();
    changes.extend(
        snapshot
            .iter()
            .filter(|node| !remaining.contains(&node.id))
            .filter_map(|node| node.id.stored())
            .map(NodeChange::Delete),
    );

    ChangeSet { changes }
}
