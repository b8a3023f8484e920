//! Structural invariant checks for normalized outlines.
//!
//! # Responsibility
//! - Report every place where a node list breaks the outline invariants.
//!
//! # Invariants
//! - Read-only; expects the list in document order.
//! - Expected codes are derived from `parent_id` links, independently of the
//!   level-based derivation the normalizer uses.

use crate::model::outline_code::OutlineCode;
use crate::model::outline_node::{NodeId, OutlineNode};
use crate::outline::normalize::detached_code;
use std::collections::HashMap;

/// One broken invariant.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    /// `parent_id` points outside the list.
    MissingParent { node: NodeId, parent: NodeId },
    /// Level differs from parent level + 1 (or 1 at the root).
    LevelMismatch {
        node: NodeId,
        level: u32,
        expected: u32,
    },
    /// A line item sits at level 1.
    LineItemAtRoot { node: NodeId },
    /// A node hangs from a line item.
    LineItemParent { node: NodeId, parent: NodeId },
    /// Level is more than one deeper than the preceding node.
    LevelJump {
        node: NodeId,
        level: u32,
        previous_level: u32,
    },
    /// Code is missing or not the next one in its sibling group.
    CodeOutOfSequence {
        node: NodeId,
        actual: Option<OutlineCode>,
        expected: OutlineCode,
    },
    /// `sort_key` is not the 1-based document position.
    SortKeyNotDense {
        node: NodeId,
        sort_key: f64,
        position: usize,
    },
}

/// Checks `nodes` (in document order) against every outline invariant.
pub fn check_invariants(nodes: &[OutlineNode]) -> Vec<InvariantViolation> {
    let by_id: HashMap<NodeId, &OutlineNode> = nodes.iter().map(|node| (node.id, node)).collect();
    let mut expected_codes: HashMap<NodeId, OutlineCode> = HashMap::new();
    let mut sibling_counters: HashMap<(Option<NodeId>, u32), u32> = HashMap::new();
    let mut seen_root_level = false;
    let mut violations = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        let position = index + 1;
        if node.sort_key != position as f64 {
            violations.push(InvariantViolation::SortKeyNotDense {
                node: node.id,
                sort_key: node.sort_key,
                position,
            });
        }

        if node.kind.is_line_item() && node.level == 1 {
            violations.push(InvariantViolation::LineItemAtRoot { node: node.id });
        }

        if let Some(previous) = index.checked_sub(1).map(|previous| &nodes[previous]) {
            if node.level > previous.level.saturating_add(1) {
                violations.push(InvariantViolation::LevelJump {
                    node: node.id,
                    level: node.level,
                    previous_level: previous.level,
                });
            }
        }

        let parent = match node.parent_id {
            Some(parent_id) => match by_id.get(&parent_id) {
                Some(parent) => Some(*parent),
                None => {
                    violations.push(InvariantViolation::MissingParent {
                        node: node.id,
                        parent: parent_id,
                    });
                    None
                }
            },
            None => None,
        };

        match parent {
            Some(parent) => {
                if parent.kind.is_line_item() {
                    violations.push(InvariantViolation::LineItemParent {
                        node: node.id,
                        parent: parent.id,
                    });
                }
                if node.level != parent.level.saturating_add(1) {
                    violations.push(InvariantViolation::LevelMismatch {
                        node: node.id,
                        level: node.level,
                        expected: parent.level.saturating_add(1),
                    });
                }
            }
            // Leading nodes before any level-1 node have nothing to hang from.
            None if node.level != 1 && seen_root_level => {
                violations.push(InvariantViolation::LevelMismatch {
                    node: node.id,
                    level: node.level,
                    expected: 1,
                });
            }
            None => {}
        }
        if node.level == 1 {
            seen_root_level = true;
        }

        let counter = sibling_counters
            .entry((node.parent_id, node.level))
            .or_insert(0);
        *counter += 1;
        let expected = match node
            .parent_id
            .and_then(|parent_id| expected_codes.get(&parent_id))
        {
            Some(parent_code) => parent_code.child(*counter),
            None => detached_code(node.level, *counter),
        };
        if node.code.as_ref() != Some(&expected) {
            violations.push(InvariantViolation::CodeOutOfSequence {
                node: node.id,
                actual: node.code.clone(),
                expected: expected.clone(),
            });
        }
        expected_codes.insert(node.id, expected);
    }

    violations
}
