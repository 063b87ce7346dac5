//! Typed record tables (items, lists, users, areas).
//!
//! # Invariants
//! - `set` only overwrites existing records; `force_set` also creates.
//! - `insert_new` assigns `max(id) + 1`, so ids start at 1 and stay unique.
//! - Id 0 is never stored; allocation past `u64::MAX` fails instead of wrapping.

use super::{RepoError, RepoResult};
use crate::codec::key::{parse_record_key, record_id_range, record_key, record_range};
use crate::codec::{decode, encode, EntityKind};
use crate::db::Tx;
use crate::model::area::Area;
use crate::model::item::Item;
use crate::model::list::List;
use crate::model::user::User;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Entity stored under its own record key.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

impl Record for Item {
    const KIND: EntityKind = EntityKind::Item;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for List {
    const KIND: EntityKind = EntityKind::List;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for Area {
    const KIND: EntityKind = EntityKind::Area;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Accessor for one record table inside a transaction.
pub struct Records<'a, R> {
    tx: &'a Tx<'a>,
    _record: PhantomData<R>,
}

impl<'a, R: Record> Records<'a, R> {
    pub(crate) fn new(tx: &'a Tx<'a>) -> Self {
        Self {
            tx,
            _record: PhantomData,
        }
    }

    /// Loads one record or fails with `NotFound`.
    pub fn get(&self, id: u64) -> RepoResult<R> {
        self.find(id)?
            .ok_or_else(|| RepoError::not_found(R::KIND, id))
    }

    pub fn find(&self, id: u64) -> RepoResult<Option<R>> {
        let key = record_key(R::KIND, id);
        match self.tx.get(&key)? {
            Some(raw) => Ok(Some(decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, id: u64) -> RepoResult<bool> {
        Ok(self.tx.get(&record_key(R::KIND, id))?.is_some())
    }

    /// Fails with `NotFound` unless the record exists.
    pub fn ensure_exists(&self, id: u64) -> RepoResult<()> {
        if self.exists(id)? {
            Ok(())
        } else {
            Err(RepoError::not_found(R::KIND, id))
        }
    }

    /// Overwrites an existing record.
    pub fn set(&self, record: &R) -> RepoResult<()> {
        self.ensure_exists(record.id())?;
        self.force_set(record)
    }

    /// Writes a record whether or not it exists yet.
    ///
    /// # Errors
    /// - `InvalidId` when the record carries id 0.
    pub fn force_set(&self, record: &R) -> RepoResult<()> {
        if record.id() == 0 {
            return Err(RepoError::InvalidId { entity: R::KIND });
        }
        let key = record_key(R::KIND, record.id());
        self.tx.set(&key, &encode(record)?)?;
        Ok(())
    }

    /// Stores `record` under the next free id and returns it with that id.
    pub fn insert_new(&self, mut record: R) -> RepoResult<R> {
        let id = self
            .last_id()?
            .checked_add(1)
            .ok_or(RepoError::IdsExhausted { entity: R::KIND })?;
        record.set_id(id);
        self.force_set(&record)?;
        Ok(record)
    }

    /// Deletes one record. Returns whether it existed.
    pub fn delete(&self, id: u64) -> RepoResult<bool> {
        Ok(self.tx.delete(&record_key(R::KIND, id))?)
    }

    /// Highest id in use, or 0 for an empty table.
    pub fn last_id(&self) -> RepoResult<u64> {
        let last = self.tx.descend(&record_range(R::KIND), Some(1))?;
        match last.first() {
            Some((key, _)) => Ok(parse_record_key(key)?.1),
            None => Ok(0),
        }
    }

    /// Every record of this table, in id order.
    pub fn all(&self) -> RepoResult<Vec<R>> {
        self.decode_all(self.tx.ascend(&record_range(R::KIND), None)?)
    }

    /// Records with ids in `from..=to`, in id order.
    pub fn in_range(&self, from: u64, to: u64) -> RepoResult<Vec<R>> {
        self.decode_all(self.tx.ascend(&record_id_range(R::KIND, from, to), None)?)
    }

    fn decode_all(&self, entries: Vec<(String, String)>) -> RepoResult<Vec<R>> {
        entries
            .iter()
            .map(|(key, raw)| decode(key, raw).map_err(RepoError::from))
            .collect()
    }
}
