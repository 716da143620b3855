//! Domain model for calorie entries.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every entry is identified by a stable `EntryId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod entry;
