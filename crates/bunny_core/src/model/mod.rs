//! Work-tracking domain model.
//!
//! # Responsibility
//! - Define the records persisted by the store (items, lists, users, areas).
//! - Define the read models assembled from records plus ordered indexes.
//!
//! # Invariants
//! - Every record is identified by a positive integer id assigned on creation.
//! - Order and focus membership are not record fields; they live in indexes.

pub mod area;
pub mod item;
pub mod list;
pub mod user;
