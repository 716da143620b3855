//! Sectioned projection of the record store.
//!
//! # Responsibility
//! - Order and group entries for display.
//! - Compute change batches between successive projections.

mod diff;
pub mod grouped;
mod layout;

pub use grouped::{GroupedIndex, GroupingMode, IndexError, Mutation, Section};
