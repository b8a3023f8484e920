//! Staging buffer for one budget outline edit session.
//!
//! # Responsibility
//! - Hold the mutable working copy of every node of one budget.
//! - Keep the last externally loaded snapshot for discard and diffing.
//!
//! # Invariants
//! - `nodes` is kept in current document order (`sort_key` ascending) after
//!   every mutation; ties keep their relative position.
//! - The buffer is exclusively owned by one edit session and threaded
//!   through operations explicitly; there is no shared global copy.

use crate::model::outline_node::{NodeId, OutlineNode};
use crate::outline::normalize::normalize;
use log::debug;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

/// Working copy of one budget outline.
#[derive(Debug, Clone, Default)]
pub struct StagingBuffer {
    pub(crate) nodes: Vec<OutlineNode>,
    snapshot: Vec<OutlineNode>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer seeded with `nodes`.
    pub fn seeded(nodes: Vec<OutlineNode>) -> Self {
        let mut buffer = Self::new();
        buffer.seed(nodes);
        buffer
    }

    /// Replaces buffer contents with a freshly loaded node list.
    ///
    /// Nodes are sorted by `sort_key`; equal keys fall back to outline code.
    /// The sorted list also becomes the discard/diff snapshot.
    pub fn seed(&mut self, mut nodes: Vec<OutlineNode>) {
        nodes.sort_by(seed_order);
        debug!(
            "event=outline_seed module=staging status=ok nodes={}",
            nodes.len()
        );
        self.snapshot = nodes.clone();
        self.nodes = nodes;
    }

    /// Drops in-progress edits and restores the last loaded snapshot.
    pub fn discard(&mut self) {
        debug!(
            "event=outline_discard module=staging status=ok nodes={}",
            self.snapshot.len()
        );
        self.nodes = self.snapshot.clone();
    }

    /// Current working nodes in document order.
    pub fn nodes(&self) -> &[OutlineNode] {
        &self.nodes
    }

    /// Node list as it was before this session's edits.
    pub fn snapshot(&self) -> &[OutlineNode] {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up one working node.
    pub fn get(&self, id: NodeId) -> Option<&OutlineNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Runs the structural normalizer over the working copy.
    pub fn normalize(&mut self) {
        normalize(&mut self.nodes);
    }

    /// Returns ids of every node below `id`, breadth-first.
    ///
    /// Removal never cascades; callers that want cascading deletes use this
    /// to collect the subtree themselves.
    pub fn descendant_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut children_by_parent: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in &self.nodes {
            if let Some(parent_id) = node.parent_id {
                children_by_parent.entry(parent_id).or_default().push(node.id);
            }
        }

        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut result = Vec::new();
        while let Some(current) = queue.pop_front() {
            let Some(children) = children_by_parent.get(&current) else {
                continue;
            };
            for child in children {
                if visited.insert(*child) {
                    result.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        result
    }

    pub(crate) fn position_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    /// Replaces the snapshot after a (possibly partial) commit.
    pub(crate) fn rebase_snapshot(&mut self, mut snapshot: Vec<OutlineNode>) {
        snapshot.sort_by(seed_order);
        self.snapshot = snapshot;
    }

    /// Rewrites node ids and parent references after the collaborator
    /// assigned persisted ids to draft nodes.
    pub(crate) fn remap_ids(&mut self, assigned: &HashMap<NodeId, NodeId>) {
        if assigned.is_empty() {
            return;
        }
        for node in &mut self.nodes {
            if let Some(new_id) = assigned.get(&node.id) {
                node.id = *new_id;
            }
            if let Some(new_parent) = node.parent_id.and_then(|parent| assigned.get(&parent)) {
                node.parent_id = Some(*new_parent);
            }
        }
    }
}

fn seed_order(a: &OutlineNode, b: &OutlineNode) -> Ordering {
    a.sort_key
        .total_cmp(&b.sort_key)
        .then_with(|| a.code.cmp(&b.code))
}
