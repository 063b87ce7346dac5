//! Transactional sorted key-value surface over the `kv` table.
//!
//! # Responsibility
//! - Own the SQLite connection that backs the store.
//! - Hand out scoped read-only (`view`) and read-write (`update`) transactions.
//! - Provide point reads/writes and ordered range scans inside a transaction.
//!
//! # Invariants
//! - At most one transaction is open per store; beginning a second one fails.
//! - Dropping a `Tx` without `close()` rolls it back, including during unwinding.
//! - Writes through a `view` transaction are rejected with `StoreError::ReadOnly`.

use super::migrations::current_user_version;
use super::{StoreError, StoreResult};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::fmt::{Display, Formatter};

/// Sorted key-value store handle.
///
/// Constructed by [`open_store`](super::open_store) or
/// [`open_store_in_memory`](super::open_store_in_memory) and passed by
/// reference to whoever needs it.
///
/// A `Store` owns one connection: it can move to another thread but not be
/// shared between threads. Concurrent readers each open their own `Store` on
/// the same database file; their `view` transactions run side by side, while
/// `update` transactions are serialized by SQLite's write lock and wait up to
/// the configured busy timeout.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub(crate) fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Begins a read-only transaction.
    pub fn view(&self) -> StoreResult<Tx<'_>> {
        Tx::begin(&self.conn, TxMode::View)
    }

    /// Begins a read-write transaction, taking the write lock immediately.
    pub fn update(&self) -> StoreResult<Tx<'_>> {
        Tx::begin(&self.conn, TxMode::Update)
    }

    /// Returns the applied schema version.
    pub fn schema_version(&self) -> StoreResult<u32> {
        current_user_version(&self.conn)
    }
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    View,
    Update,
}

impl TxMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Update => "update",
        }
    }
}

impl Display for TxMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open key range `[start, end)`. `end == None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: String,
    pub end: Option<String>,
}

impl KeyRange {
    /// Range holding every key between `start` (inclusive) and `end` (exclusive).
    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: Some(end.into()),
        }
    }

    /// Range holding every key that starts with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let start = prefix.into();
        let mut end = start.clone();
        let successor = end
            .pop()
            .and_then(|last| char::from_u32(u32::from(last) + 1));
        match successor {
            Some(next) => {
                end.push(next);
                Self {
                    start,
                    end: Some(end),
                }
            }
            None => Self { start, end: None },
        }
    }

    /// Returns whether `key` falls inside this range.
    pub fn contains(&self, key: &str) -> bool {
        key >= self.start.as_str() && self.end.as_deref().map_or(true, |end| key < end)
    }
}

/// One open store transaction.
pub struct Tx<'s> {
    inner: Transaction<'s>,
    mode: TxMode,
}

impl<'s> Tx<'s> {
    fn begin(conn: &'s Connection, mode: TxMode) -> StoreResult<Self> {
        let behavior = match mode {
            TxMode::View => TransactionBehavior::Deferred,
            TxMode::Update => TransactionBehavior::Immediate,
        };
        let inner = Transaction::new_unchecked(conn, behavior).map_err(|err| {
            error!("event=tx_begin module=db status=error mode={mode} error={err}");
            StoreError::from(err)
        })?;
        Ok(Self { inner, mode })
    }

    pub fn mode(&self) -> TxMode {
        self.mode
    }

    pub fn is_writable(&self) -> bool {
        self.mode == TxMode::Update
    }

    /// Reads the value stored under `key`.
    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut stmt = self
            .inner
            .prepare_cached("SELECT value FROM kv WHERE key = ?1;")?;
        let value = stmt
            .query_row([key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    /// Inserts or overwrites the value stored under `key`.
    pub fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.ensure_writable()?;
        let mut stmt = self.inner.prepare_cached(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        )?;
        stmt.execute(params![key, value])?;
        Ok(())
    }

    /// Deletes `key`. Returns whether a value was present.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        self.ensure_writable()?;
        let mut stmt = self.inner.prepare_cached("DELETE FROM kv WHERE key = ?1;")?;
        let changed = stmt.execute([key])?;
        Ok(changed > 0)
    }

    /// Returns `(key, value)` pairs in `range`, ascending, at most `limit` of them.
    pub fn ascend(
        &self,
        range: &KeyRange,
        limit: Option<usize>,
    ) -> StoreResult<Vec<(String, String)>> {
        self.scan(
            "SELECT key, value FROM kv
             WHERE key >= ?1 AND (?2 IS NULL OR key < ?2)
             ORDER BY key ASC
             LIMIT ?3;",
            range,
            limit,
        )
    }

    /// Returns `(key, value)` pairs in `range`, descending, at most `limit` of them.
    pub fn descend(
        &self,
        range: &KeyRange,
        limit: Option<usize>,
    ) -> StoreResult<Vec<(String, String)>> {
        self.scan(
            "SELECT key, value FROM kv
             WHERE key >= ?1 AND (?2 IS NULL OR key < ?2)
             ORDER BY key DESC
             LIMIT ?3;",
            range,
            limit,
        )
    }

    /// Ends the transaction: commits an `update`, rolls back a `view`.
    ///
    /// A close-time failure is logged here and returned; the transaction is
    /// gone either way.
    pub fn close(self) -> StoreResult<()> {
        let mode = self.mode;
        let result = match mode {
            TxMode::Update => self.inner.commit(),
            TxMode::View => self.inner.rollback(),
        };
        match result {
            Ok(()) => {
                debug!("event=tx_close module=db status=ok mode={mode}");
                Ok(())
            }
            Err(err) => {
                error!("event=tx_close module=db status=error mode={mode} error={err}");
                Err(err.into())
            }
        }
    }

    /// Aborts the transaction, discarding every write made through it.
    pub fn rollback(self) -> StoreResult<()> {
        let mode = self.mode;
        self.inner.rollback().map_err(|err| {
            error!("event=tx_rollback module=db status=error mode={mode} error={err}");
            StoreError::from(err)
        })?;
        debug!("event=tx_rollback module=db status=ok mode={mode}");
        Ok(())
    }

    fn scan(
        &self,
        sql: &str,
        range: &KeyRange,
        limit: Option<usize>,
    ) -> StoreResult<Vec<(String, String)>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map_or(-1, |value| i64::try_from(value).unwrap_or(i64::MAX));
        let mut stmt = self.inner.prepare_cached(sql)?;
        let mut rows = stmt.query(params![range.start, range.end, limit])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push((row.get::<_, String>(0)?, row.get::<_, String>(1)?));
        }
        Ok(entries)
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(StoreError::ReadOnly)
        }
    }
}
