//! Budget outline edit session use-case service.
//!
//! # Responsibility
//! - Load one budget outline from the persistence collaborator into a
//!   staging buffer.
//! - Commit: normalize, diff against the pre-edit snapshot and persist the
//!   change set one node at a time.
//!
//! # Invariants
//! - Writes are issued sequentially in change-set order; a failed write never
//!   rolls back earlier ones.
//! - A draft node's assigned id replaces the draft id in every later write
//!   and in the buffer.
//! - Only successful writes are folded into the snapshot, so committing
//!   again resends exactly what failed or was skipped.

use crate::model::outline_node::{BudgetId, NodeId, OutlineNode, StoredId};
use crate::outline::diff::{diff, ChangeSet, NodeChange};
use crate::outline::staging::StagingBuffer;
use crate::repo::outline_store::{OutlineStore, StoreError};
use log::{error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// What to do with the rest of a change set after one write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitPolicy {
    /// Stop issuing writes; remaining changes are reported as skipped.
    #[default]
    StopOnFirstError,
    /// Keep issuing the remaining writes.
    ContinueOnError,
}

/// Errors from outline service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineServiceError {
    /// Persistence collaborator failure.
    Store(StoreError),
    /// Node's parent is a draft whose create has not succeeded.
    UnresolvedParent { node: NodeId, parent: NodeId },
}

impl Display for OutlineServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::UnresolvedParent { node, parent } => write!(
                f,
                "outline node {node} waits for unpersisted parent {parent}"
            ),
        }
    }
}

impl Error for OutlineServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::UnresolvedParent { .. } => None,
        }
    }
}

impl From<StoreError> for OutlineServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// One failed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFailure {
    pub node_id: NodeId,
    pub error: OutlineServiceError,
}

/// Outcome of one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Ids of nodes written successfully (persisted ids for creates).
    pub applied: Vec<NodeId>,
    /// Draft ids paired with the ids the collaborator assigned.
    pub created: Vec<(NodeId, StoredId)>,
    pub failed: Vec<CommitFailure>,
    /// Changes not attempted because the policy stopped the commit.
    pub skipped: Vec<NodeId>,
}

impl CommitReport {
    /// Returns whether every change was persisted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Edit session over one budget outline.
pub struct OutlineEditSession<S: OutlineStore> {
    store: S,
    budget_id: BudgetId,
    buffer: StagingBuffer,
}

impl<S: OutlineStore> OutlineEditSession<S> {
    /// Loads the outline of `budget_id` and seeds a fresh staging buffer.
    pub fn load(store: S, budget_id: BudgetId) -> Result<Self, OutlineServiceError> {
        let nodes = store.load_outline(budget_id)?;
        info!(
            "event=outline_load module=service status=ok budget={budget_id} nodes={}",
            nodes.len()
        );
        Ok(Self {
            store,
            budget_id,
            buffer: StagingBuffer::seeded(nodes),
        })
    }

    /// Reloads from the collaborator, dropping edits and snapshot.
    pub fn reload(&mut self) -> Result<(), OutlineServiceError> {
        let nodes = self.store.load_outline(self.budget_id)?;
        info!(
            "event=outline_reload module=service status=ok budget={} nodes={}",
            self.budget_id,
            nodes.len()
        );
        self.buffer.seed(nodes);
        Ok(())
    }

    pub fn budget_id(&self) -> BudgetId {
        self.budget_id
    }

    pub fn buffer(&self) -> &StagingBuffer {
        &self.buffer
    }

    /// Working copy for ordering and re-parenting operations.
    pub fn buffer_mut(&mut self) -> &mut StagingBuffer {
        &mut self.buffer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Change set a commit would write now, without touching the buffer.
    pub fn pending_changes(&self) -> ChangeSet {
        let mut preview = self.buffer.clone();
        preview.normalize();
        diff(preview.snapshot(), preview.nodes())
    }

    /// Normalizes the buffer and persists the resulting change set.
    pub fn commit(&mut self, policy: CommitPolicy) -> CommitReport {
        let started_at = Instant::now();
        self.buffer.normalize();
        let change_set = diff(self.buffer.snapshot(), self.buffer.nodes());
        info!(
            "event=outline_commit module=service status=start budget={} changes={} policy={policy:?}",
            self.budget_id,
            change_set.len()
        );

        let mut snapshot: HashMap<NodeId, OutlineNode> = self
            .buffer
            .snapshot()
            .iter()
            .map(|node| (node.id, node.clone()))
            .collect();
        let mut assigned: HashMap<NodeId, NodeId> = HashMap::new();
        let mut report = CommitReport::default();
        let mut halted = false;

        for change in change_set.changes {
            let node_id = change.node_id();
            if halted {
                report.skipped.push(node_id);
                continue;
            }

            match self.apply_change(change, &assigned) {
                Ok(applied) => {
                    if let Some(stored) = applied.created {
                        assigned.insert(node_id, NodeId::Stored(stored));
                        report.created.push((node_id, stored));
                    }
                    match applied.row {
                        Some(row) => {
                            report.applied.push(row.id);
                            snapshot.insert(row.id, row);
                        }
                        None => {
                            report.applied.push(node_id);
                            snapshot.remove(&node_id);
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        "event=outline_commit_write module=service status=error budget={} node={node_id} error={err}",
                        self.budget_id
                    );
                    report.failed.push(CommitFailure {
                        node_id,
                        error: err,
                    });
                    halted = policy == CommitPolicy::StopOnFirstError;
                }
            }
        }

        self.buffer.remap_ids(&assigned);
        self.buffer
            .rebase_snapshot(snapshot.into_values().collect());

        if report.is_complete() {
            info!(
                "event=outline_commit module=service status=ok budget={} applied={} duration_ms={}",
                self.budget_id,
                report.applied.len(),
                started_at.elapsed().as_millis()
            );
        } else {
            error!(
                "event=outline_commit module=service status=partial budget={} applied={} failed={} skipped={} duration_ms={}",
                self.budget_id,
                report.applied.len(),
                report.failed.len(),
                report.skipped.len(),
                started_at.elapsed().as_millis()
            );
        }
        report
    }

    fn apply_change(
        &self,
        change: NodeChange,
        assigned: &HashMap<NodeId, NodeId>,
    ) -> Result<AppliedChange, OutlineServiceError> {
        match change {
            NodeChange::Create(node) => {
                let mut row = resolve_parent(node, assigned)?;
                let stored = self.store.create_node(self.budget_id, &row)?;
                row.id = NodeId::Stored(stored);
                Ok(AppliedChange {
                    row: Some(row),
                    created: Some(stored),
                })
            }
            NodeChange::Update(node) => {
                let row = resolve_parent(node, assigned)?;
                self.store.update_node(self.budget_id, &row)?;
                Ok(AppliedChange {
                    row: Some(row),
                    created: None,
                })
            }
            NodeChange::Delete(id) => {
                self.store.delete_node(self.budget_id, id)?;
                Ok(AppliedChange {
                    row: None,
                    created: None,
                })
            }
        }
    }
}

struct AppliedChange {
    /// Row as persisted; `None` for deletes.
    row: Option<OutlineNode>,
    created: Option<StoredId>,
}

/// Replaces a draft parent reference with its assigned id.
fn resolve_parent(
    mut node: OutlineNode,
    assigned: &HashMap<NodeId, NodeId>,
) -> Result<OutlineNode, OutlineServiceError> {
    if let Some(parent) = node.parent_id.filter(|parent| parent.is_draft()) {
        let resolved = assigned
            .get(&parent)
            .copied()
            .ok_or(OutlineServiceError::UnresolvedParent {
                node: node.id,
                parent,
            })?;
        node.parent_id = Some(resolved);
    }
    Ok(node)
}
