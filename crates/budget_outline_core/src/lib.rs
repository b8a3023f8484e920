//! Budget outline structuring engine.
//! Maintains the "Títulos"/"Partidas" hierarchy of a construction budget:
//! staged reordering and re-indenting, invariant-restoring normalization,
//! outline code generation and minimal change sets.

pub mod logging;
pub mod model;
pub mod outline;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::outline_code::{OutlineCode, OutlineCodeError};
pub use model::outline_node::{
    structurally_equal, BudgetId, NodeId, NodeKind, OutlineNode, PricedDetail, StoredId,
};
pub use outline::diff::{diff, ChangeSet, NodeChange};
pub use outline::normalize::{normalize, NORMALIZE_PASSES};
pub use outline::ordering::{MoveDirection, MAX_OUTLINE_LEVEL};
pub use outline::staging::StagingBuffer;
pub use outline::tree_view::{build_tree, has_children, visible_nodes, TreeNode};
pub use outline::validate::{check_invariants, InvariantViolation};
pub use repo::outline_store::{MemoryOutlineStore, OutlineStore, StoreError, StoreResult};
pub use service::outline_service::{
    CommitFailure, CommitPolicy, CommitReport, OutlineEditSession, OutlineServiceError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
