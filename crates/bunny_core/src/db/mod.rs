//! Sorted key-value storage on top of SQLite.
//!
//! # Responsibility
//! - Open and configure the SQLite connection backing the store.
//! - Apply schema migrations in deterministic order.
//! - Expose a transactional get/set/delete/range-scan surface over string keys.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Keys compare bytewise, so range scans follow lexicographic key order.
//! - Core code must not read/write application data before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod store;

pub use open::{open_store, open_store_in_memory, StoreConfig};
pub use store::{KeyRange, Store, Tx, TxMode};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// A write was attempted through a read-only (`view`) transaction.
    ReadOnly,
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::ReadOnly => write!(f, "write attempted in a read-only transaction"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "store schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::ReadOnly => None,
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
