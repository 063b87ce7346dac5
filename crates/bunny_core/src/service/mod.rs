//! Use-case level API over the repository layer.
//!
//! # Responsibility
//! - Turn single operations into one scoped store transaction each.
//! - Keep callers (CLI, future HTTP handlers) free of key and index details.

pub mod repository;

pub use repository::EntityRepository;
