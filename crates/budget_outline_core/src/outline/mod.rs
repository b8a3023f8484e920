//! Hierarchical line-item structuring engine.
//!
//! # Responsibility
//! - Stage edits to one budget outline (`staging`, `ordering`).
//! - Restore structural invariants (`normalize`, `validate`).
//! - Compute minimal writes (`diff`) and display projections (`tree_view`).
//!
//! # Invariants
//! - Every function here is synchronous and infallible; persistence lives in
//!   `service::outline_service`.

pub mod diff;
pub mod normalize;
pub mod ordering;
pub mod staging;
pub mod tree_view;
pub mod validate;
