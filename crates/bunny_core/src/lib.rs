//! Core of the bunny work tracker.
//!
//! Items, lists, users and areas persist in a sorted key-value store. Lists,
//! areas and per-user focus buckets keep a dense `1..=N` member order.

pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{open_store, open_store_in_memory, Store, StoreConfig, StoreError};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::area::{Area, AreaEntry, AreaId, Thing};
pub use model::item::{Item, ItemId, ItemState, UserItem};
pub use model::list::{List, ListId};
pub use model::user::{FocusBucket, FocusData, User, UserId};
pub use repo::{ErrorKind, RepoError, RepoResult};
pub use service::EntityRepository;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
