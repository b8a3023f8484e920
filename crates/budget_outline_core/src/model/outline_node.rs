//! Budget outline node model ("Títulos" and "Partidas").
//!
//! # Responsibility
//! - Define the flat record the structuring engine works on.
//! - Define the structural equality used to compute minimal change sets.
//!
//! # Invariants
//! - A node is "new" until the persistence collaborator assigns a `StoredId`.
//! - `level`, `code` and `parent_id` are owned by the normalizer once a node
//!   is under engine control; `label`, `category_id` and `priced_detail` are
//!   never touched by the engine.

use crate::model::outline_code::OutlineCode;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier assigned by the persistence collaborator.
pub type StoredId = i64;

/// Identifier of the budget owning one outline.
pub type BudgetId = i64;

/// Node identity inside one edit session.
///
/// Persisted nodes carry the collaborator id; nodes added during the session
/// carry a local draft id until their first commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    /// Id assigned by the persistence collaborator.
    Stored(StoredId),
    /// Temporary local id for a node that was never committed.
    Draft(Uuid),
}

impl NodeId {
    /// Generates a fresh draft id.
    pub fn new_draft() -> Self {
        Self::Draft(Uuid::new_v4())
    }

    /// Returns the persisted id, if any.
    pub fn stored(self) -> Option<StoredId> {
        match self {
            Self::Stored(id) => Some(id),
            Self::Draft(_) => None,
        }
    }

    pub fn is_draft(self) -> bool {
        matches!(self, Self::Draft(_))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored(id) => write!(f, "{id}"),
            Self::Draft(id) => write!(f, "draft:{id}"),
        }
    }
}

/// Outline node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Grouping heading ("Título"); may contain children.
    #[serde(rename = "TITULO")]
    Section,
    /// Costed work item ("Partida"); leaf, never at level 1.
    #[serde(rename = "PARTIDA")]
    LineItem,
}

impl NodeKind {
    pub fn is_line_item(self) -> bool {
        self == Self::LineItem
    }

    /// Lowest level this kind may occupy.
    pub fn min_level(self) -> u32 {
        match self {
            Self::Section => 1,
            Self::LineItem => 2,
        }
    }
}

/// Priced detail attached to a line item ("APU").
///
/// Opaque to the engine: carried through seeding, editing and commit as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedDetail {
    /// Measurement unit, e.g. `m3`.
    #[serde(rename = "unidad")]
    pub unit: String,
    /// Measured quantity.
    #[serde(rename = "metrado")]
    pub quantity: f64,
    /// Unit price.
    #[serde(rename = "precio_unitario")]
    pub unit_price: f64,
    /// Work-shift length in hours.
    #[serde(rename = "jornada")]
    pub shift_hours: Option<f64>,
}

/// One outline entry of a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub id: NodeId,
    /// `None` means root-level.
    pub parent_id: Option<NodeId>,
    #[serde(rename = "tipo")]
    pub kind: NodeKind,
    /// Depth in the tree, starting at 1.
    #[serde(rename = "nivel")]
    pub level: u32,
    /// Relative order hint; dense `1..N` after normalization.
    #[serde(rename = "orden")]
    pub sort_key: f64,
    /// Unset until the normalizer runs for a freshly added node.
    #[serde(rename = "item")]
    pub code: Option<OutlineCode>,
    #[serde(rename = "descripcion")]
    pub label: String,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i64>,
    #[serde(rename = "apu", default, skip_serializing_if = "Option::is_none")]
    pub priced_detail: Option<PricedDetail>,
}

impl OutlineNode {
    /// Creates a node with a fresh draft id and no code.
    pub fn draft(
        parent_id: Option<NodeId>,
        kind: NodeKind,
        level: u32,
        sort_key: f64,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: NodeId::new_draft(),
            parent_id,
            kind,
            level,
            sort_key,
            code: None,
            label: label.into(),
            category_id: None,
            priced_detail: None,
        }
    }

    /// Returns whether this node was never committed.
    pub fn is_new(&self) -> bool {
        self.id.is_draft()
    }

    /// Code rendered for display, empty when unset.
    pub fn code_text(&self) -> String {
        self.code
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// Returns whether two versions of a node agree on every persisted
/// structural field.
///
/// `sort_key` is compared as the dense document position the normalizer
/// assigns, so a node that keeps its place is not rewritten. Descriptive
/// fields belong to the CRUD path.
pub fn structurally_equal(a: &OutlineNode, b: &OutlineNode) -> bool {
    a.level == b.level
        && a.code == b.code
        && a.parent_id == b.parent_id
        && a.sort_key == b.sort_key
}
