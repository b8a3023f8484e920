//! Outline domain model.
//!
//! # Responsibility
//! - Define the flat node record shared by every engine component.
//! - Define the typed outline code label.
//!
//! # Invariants
//! - The tree is expressed as a flat list with parent references; nested
//!   views are derived projections only.

pub mod outline_code;
pub mod outline_node;
