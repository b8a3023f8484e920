//! User-invoked reorder and re-indent operations on the staging buffer.
//!
//! # Responsibility
//! - Swap adjacent nodes, change indentation depth, add and remove nodes.
//!
//! # Invariants
//! - Every operation is total: unknown ids and boundary moves are no-ops.
//! - Operations never touch `code`, and only `add_node` sets `parent_id`;
//!   both are resolved later by the normalizer, so the buffer may violate
//!   structural invariants between operations.

use crate::model::outline_node::{NodeId, NodeKind, OutlineNode};
use crate::outline::staging::StagingBuffer;
use log::debug;

/// Deepest level `change_depth` will indent to.
pub const MAX_OUTLINE_LEVEL: u32 = 5;

/// Offset placing a new node between its anchor and the anchor's successor.
pub const NEW_NODE_SORT_OFFSET: f64 = 0.5;

/// Direction for `move_adjacent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl StagingBuffer {
    /// Raises or lowers one node's level by one.
    ///
    /// Levels stay within `1..=MAX_OUTLINE_LEVEL`. Returns whether the level
    /// changed.
    pub fn change_depth(&mut self, id: NodeId, increase: bool) -> bool {
        let Some(index) = self.position_of(id) else {
            debug!("event=outline_change_depth module=ordering status=noop reason=unknown_node node={id}");
            return false;
        };

        let node = &mut self.nodes[index];
        let next_level = if increase {
            node.level.saturating_add(1).min(MAX_OUTLINE_LEVEL.max(node.level))
        } else {
            node.level.saturating_sub(1).max(1)
        };
        if next_level == node.level {
            debug!(
                "event=outline_change_depth module=ordering status=noop reason=clamped node={id} level={}",
                node.level
            );
            return false;
        }

        node.level = next_level;
        debug!(
            "event=outline_change_depth module=ordering status=ok node={id} level={next_level}"
        );
        true
    }

    /// Swaps one node with its neighbour in current document order.
    ///
    /// Returns the id of the moved node so the caller can highlight it, or
    /// `None` when the node is unknown or already at the boundary.
    pub fn move_adjacent(&mut self, id: NodeId, direction: MoveDirection) -> Option<NodeId> {
        let index = self.position_of(id)?;
        let neighbour = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|next| *next < self.nodes.len()),
        };
        let Some(neighbour) = neighbour else {
            debug!("event=outline_move module=ordering status=noop reason=boundary node={id}");
            return None;
        };

        let moved_key = self.nodes[index].sort_key;
        self.nodes[index].sort_key = self.nodes[neighbour].sort_key;
        self.nodes[neighbour].sort_key = moved_key;
        self.nodes.swap(index, neighbour);

        debug!(
            "event=outline_move module=ordering status=ok node={id} direction={direction:?} position={neighbour}"
        );
        Some(id)
    }

    /// Inserts a new node right after the node ordered at `after_sort_key`.
    ///
    /// The new node gets a draft id, `sort_key = after_sort_key + 0.5`,
    /// `level = parent.level + 1` (1 without a parent or when the parent is
    /// not in the buffer) and no code.
    pub fn add_node(
        &mut self,
        parent_id: Option<NodeId>,
        after_sort_key: f64,
        kind: NodeKind,
        label: impl Into<String>,
    ) -> NodeId {
        let level = parent_id
            .and_then(|parent| self.get(parent))
            .map_or(1, |parent| parent.level.saturating_add(1));
        let sort_key = after_sort_key + NEW_NODE_SORT_OFFSET;
        let node = OutlineNode::draft(parent_id, kind, level, sort_key, label);
        let id = node.id;

        let position = self
            .nodes
            .iter()
            .position(|existing| existing.sort_key >= sort_key)
            .unwrap_or(self.nodes.len());
        self.nodes.insert(position, node);

        debug!(
            "event=outline_add module=ordering status=ok node={id} kind={kind:?} level={level} position={position}"
        );
        id
    }

    /// Removes exactly one node; descendants are left in place.
    pub fn remove_node(&mut self, id: NodeId) -> Option<OutlineNode> {
        let Some(index) = self.position_of(id) else {
            debug!("event=outline_remove module=ordering status=noop reason=unknown_node node={id}");
            return None;
        };
        let removed = self.nodes.remove(index);
        debug!("event=outline_remove module=ordering status=ok node={id}");
        Some(removed)
    }
}
