//! Store bootstrap utilities.
//!
//! # Responsibility
//! - Open file-backed or in-memory SQLite connections for the store.
//! - Configure the transaction-acquisition timeout.
//! - Trigger schema migrations before returning a usable store.
//!
//! # Invariants
//! - Returned stores have migrations fully applied.
//! - A writer waiting for the database lock gives up after `busy_timeout`.

use super::migrations::apply_migrations;
use super::{Store, StoreResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Default wait for a contended write lock before a transaction fails.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection-level settings applied when a store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound on waiting for the database lock when beginning a transaction.
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Opens a file-backed store and applies all pending migrations.
///
/// # Side effects
/// - Creates the database file when it does not exist.
/// - Emits `db_open` logging events with duration and status.
pub fn open_store(path: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<Store> {
    open_with("file", config, || Connection::open(path))
}

/// Opens an in-memory store and applies all pending migrations.
///
/// Used by tests and by the CLI when no database path is configured.
pub fn open_store_in_memory(config: &StoreConfig) -> StoreResult<Store> {
    open_with("memory", config, Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    config: &StoreConfig,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> StoreResult<Store> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    if let Err(err) = bootstrap_connection(&mut conn, config) {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={} duration_ms={} busy_timeout_ms={}",
        mode,
        started_at.elapsed().as_millis(),
        config.busy_timeout.as_millis()
    );
    Ok(Store::from_connection(conn))
}

fn bootstrap_connection(conn: &mut Connection, config: &StoreConfig) -> StoreResult<()> {
    conn.busy_timeout(config.busy_timeout)?;
    apply_migrations(conn)?;
    Ok(())
}
