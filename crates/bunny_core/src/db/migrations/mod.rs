//! Schema steps for the key-value table.
//!
//! The schema version lives in `PRAGMA user_version`. Each step runs in the
//! same transaction as the version bump that records it.

use crate::db::{StoreError, StoreResult};
use log::info;
use rusqlite::Connection;

/// `(version, sql)` pairs, strictly increasing by version.
const STEPS: &[(u32, &str)] = &[(1, include_str!("0001_kv.sql"))];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |&(version, _)| version)
}

/// Brings the store schema up to [`latest_version`].
///
/// Returns how many steps ran.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
pub fn apply_migrations(conn: &mut Connection) -> StoreResult<usize> {
    let from = current_user_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(StoreError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&(u32, &str)> = STEPS.iter().filter(|(version, _)| *version > from).collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for &&(version, sql) in &pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from={from} to={latest} steps={}",
        pending.len()
    );
    Ok(pending.len())
}

pub(crate) fn current_user_version(conn: &Connection) -> StoreResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}
