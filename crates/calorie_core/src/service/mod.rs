//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep display surfaces decoupled from storage details.

pub mod diet_policy;
pub mod record_store;
