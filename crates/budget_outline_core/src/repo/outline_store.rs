//! Outline persistence collaborator contract and in-memory implementation.
//!
//! # Responsibility
//! - Define what the engine needs from the remote store: load one budget's
//!   outline and write one node at a time.
//! - Provide an in-process store for embedding and tests.
//!
//! # Invariants
//! - Every write addresses exactly one node; there are no batch semantics.
//! - Parents referenced by written nodes must already be persisted.
//! - Priced-detail attachments are stored and returned untouched.

use crate::model::outline_node::{BudgetId, NodeId, OutlineNode, StoredId};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by outline store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the persistence collaborator for one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Target node is not persisted for this budget.
    NodeNotFound(NodeId),
    /// Node references a parent that is not persisted for this budget.
    ParentNotPersisted { node: NodeId, parent: NodeId },
    /// Collaborator refused the write.
    Rejected(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "outline node not found: {id}"),
            Self::ParentNotPersisted { node, parent } => {
                write!(f, "parent {parent} of outline node {node} is not persisted")
            }
            Self::Rejected(message) => write!(f, "outline store rejected write: {message}"),
        }
    }
}

impl Error for StoreError {}

/// Persistence collaborator for budget outlines.
///
/// Calls are synchronous. The commit loop issues them one at a time and
/// waits for each result before the next, so a remote implementation blocks
/// on its own transport inside each call.
pub trait OutlineStore {
    /// Loads every outline node of one budget as a flat list.
    fn load_outline(&self, budget_id: BudgetId) -> StoreResult<Vec<OutlineNode>>;
    /// Persists a new node and returns its assigned id.
    fn create_node(&self, budget_id: BudgetId, node: &OutlineNode) -> StoreResult<StoredId>;
    /// Overwrites one persisted node.
    fn update_node(&self, budget_id: BudgetId, node: &OutlineNode) -> StoreResult<()>;
    /// Deletes one persisted node. Descendants are not touched.
    fn delete_node(&self, budget_id: BudgetId, id: StoredId) -> StoreResult<()>;
}

impl<S: OutlineStore + ?Sized> OutlineStore for &S {
    fn load_outline(&self, budget_id: BudgetId) -> StoreResult<Vec<OutlineNode>> {
        (**self).load_outline(budget_id)
    }

    fn create_node(&self, budget_id: BudgetId, node: &OutlineNode) -> StoreResult<StoredId> {
        (**self).create_node(budget_id, node)
    }

    fn update_node(&self, budget_id: BudgetId, node: &OutlineNode) -> StoreResult<()> {
        (**self).update_node(budget_id, node)
    }

    fn delete_node(&self, budget_id: BudgetId, id: StoredId) -> StoreResult<()> {
        (**self).delete_node(budget_id, id)
    }
}

/// Single-threaded in-memory outline store.
#[derive(Debug)]
pub struct MemoryOutlineStore {
    budgets: RefCell<BTreeMap<BudgetId, BTreeMap<StoredId, OutlineNode>>>,
    next_id: Cell<StoredId>,
    rejected: RefCell<HashSet<NodeId>>,
    writes: Cell<usize>,
}

impl Default for MemoryOutlineStore {
    fn default() -> Self {
        Self {
            budgets: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
            rejected: RefCell::new(HashSet::new()),
            writes: Cell::new(0),
        }
    }
}

impl MemoryOutlineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `nodes` for `budget_id` as already-persisted rows.
    ///
    /// Draft nodes get fresh ids, and references to them are rewritten.
    pub fn insert_outline(&self, budget_id: BudgetId, nodes: Vec<OutlineNode>) -> Vec<StoredId> {
        let mut assigned: HashMap<NodeId, NodeId> = HashMap::new();
        let mut prepared = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            let stored = match node.id {
                NodeId::Stored(id) => id,
                NodeId::Draft(_) => self.allocate_id(),
            };
            self.next_id.set(self.next_id.get().max(stored + 1));
            assigned.insert(node.id, NodeId::Stored(stored));
            node.id = NodeId::Stored(stored);
            prepared.push(node);
        }

        let mut budgets = self.budgets.borrow_mut();
        let rows = budgets.entry(budget_id).or_default();
        let mut ids = Vec::with_capacity(prepared.len());
        for mut node in prepared {
            if let Some(parent) = node.parent_id.and_then(|parent| assigned.get(&parent)) {
                node.parent_id = Some(*parent);
            }
            let id = node.id.stored().unwrap_or_default();
            ids.push(id);
            rows.insert(id, node);
        }
        ids
    }

    /// Makes every following write for `id` fail with `StoreError::Rejected`.
    pub fn reject_writes_for(&self, id: NodeId) {
        self.rejected.borrow_mut().insert(id);
    }

    /// Clears injected write failures.
    pub fn accept_all_writes(&self) {
        self.rejected.borrow_mut().clear();
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Returns one persisted node.
    pub fn get_node(&self, budget_id: BudgetId, id: StoredId) -> Option<OutlineNode> {
        self.budgets
            .borrow()
            .get(&budget_id)
            .and_then(|rows| rows.get(&id))
            .cloned()
    }

    fn allocate_id(&self) -> StoredId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn ensure_accepted(&self, id: NodeId) -> StoreResult<()> {
        if self.rejected.borrow().contains(&id) {
            return Err(StoreError::Rejected(format!("write refused for node {id}")));
        }
        Ok(())
    }

    fn ensure_parent_persisted(
        rows: &BTreeMap<StoredId, OutlineNode>,
        node: &OutlineNode,
    ) -> StoreResult<()> {
        let Some(parent) = node.parent_id else {
            return Ok(());
        };
        let persisted = parent.stored().is_some_and(|id| rows.contains_key(&id));
        if !persisted {
            return Err(StoreError::ParentNotPersisted {
                node: node.id,
                parent,
            });
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.set(self.writes.get() + 1);
    }
}

impl OutlineStore for MemoryOutlineStore {
    fn load_outline(&self, budget_id: BudgetId) -> StoreResult<Vec<OutlineNode>> {
        Ok(self
            .budgets
            .borrow()
            .get(&budget_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn create_node(&self, budget_id: BudgetId, node: &OutlineNode) -> StoreResult<StoredId> {
        self.ensure_accepted(node.id)?;
        let mut budgets = self.budgets.borrow_mut();
        let rows = budgets.entry(budget_id).or_default();
        Self::ensure_parent_persisted(rows, node)?;

        let id = self.allocate_id();
        let mut row = node.clone();
        row.id = NodeId::Stored(id);
        rows.insert(id, row);
        self.record_write();
        Ok(id)
    }

    fn update_node(&self, budget_id: BudgetId, node: &OutlineNode) -> StoreResult<()> {
        self.ensure_accepted(node.id)?;
        let mut budgets = self.budgets.borrow_mut();
        let rows = budgets
            .get_mut(&budget_id)
            .ok_or(StoreError::NodeNotFound(node.id))?;
        let id = node
            .id
            .stored()
            .filter(|id| rows.contains_key(id))
            .ok_or(StoreError::NodeNotFound(node.id))?;
        Self::ensure_parent_persisted(rows, node)?;

        rows.insert(id, node.clone());
        self.record_write();
        Ok(())
    }

    fn delete_node(&self, budget_id: BudgetId, id: StoredId) -> StoreResult<()> {
        self.ensure_accepted(NodeId::Stored(id))?;
        let removed = self
            .budgets
            .borrow_mut()
            .get_mut(&budget_id)
            .and_then(|rows| rows.remove(&id));
        if removed.is_none() {
            return Err(StoreError::NodeNotFound(NodeId::Stored(id)));
        }
        self.record_write();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryOutlineStore, OutlineStore, StoreError};
    use crate::model::outline_node::{NodeId, NodeKind, OutlineNode};

    #[test]
    fn insert_outline_assigns_ids_and_rewrites_draft_parents() {
        let store = MemoryOutlineStore::new();
        let parent = OutlineNode::draft(None, NodeKind::Section, 1, 1.0, "Obras provisionales");
        let child = OutlineNode::draft(Some(parent.id), NodeKind::LineItem, 2, 2.0, "Cartel");

        let ids = store.insert_outline(7, vec![parent, child]);
        let loaded = store.load_outline(7).unwrap();
        assert_eq!(loaded.len(), 2);
        let child_row = store.get_node(7, ids[1]).unwrap();
        assert_eq!(child_row.parent_id, Some(NodeId::Stored(ids[0])));
    }

    #[test]
    fn create_rejects_unpersisted_parent() {
        let store = MemoryOutlineStore::new();
        let draft_parent = NodeId::new_draft();
        let child = OutlineNode::draft(Some(draft_parent), NodeKind::LineItem, 2, 1.0, "Trazo");

        let err = store.create_node(1, &child).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ParentNotPersisted { parent, .. } if parent == draft_parent
        ));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn injected_rejection_applies_until_cleared() {
        let store = MemoryOutlineStore::new();
        let ids = store.insert_outline(
            1,
            vec![OutlineNode::draft(None, NodeKind::Section, 1, 1.0, "Estructuras")],
        );
        store.reject_writes_for(NodeId::Stored(ids[0]));
        assert!(matches!(
            store.delete_node(1, ids[0]),
            Err(StoreError::Rejected(_))
        ));

        store.accept_all_writes();
        store.delete_node(1, ids[0]).unwrap();
        assert!(store.get_node(1, ids[0]).is_none());
        assert!(matches!(
            store.delete_node(1, ids[0]),
            Err(StoreError::NodeNotFound(_))
        ));
    }
}
