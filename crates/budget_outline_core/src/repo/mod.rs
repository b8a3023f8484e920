//! Persistence collaborator contracts.
//!
//! # Responsibility
//! - Define the narrow load/write-one-node boundary the engine persists
//!   through.
//! - Keep storage details out of the structuring engine.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NodeNotFound`,
//!   `ParentNotPersisted`) besides collaborator rejections.

pub mod outline_store;
