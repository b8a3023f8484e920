//! Outline use-case services.
//!
//! # Responsibility
//! - Orchestrate staging, normalization, diffing and persistence into an
//!   edit-session API.
//! - Keep UI callers decoupled from store details.

pub mod outline_service;
