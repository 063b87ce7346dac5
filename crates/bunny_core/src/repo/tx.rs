//! Scoped data transactions.
//!
//! A `DataTx` is acquired with [`DataTx::view`] or [`DataTx::update`] and
//! released with [`DataTx::close`]. Any other exit (an early `?` return or a
//! panic unwinding through the caller) drops it, which rolls back.

use super::focus::FocusIndex;
use super::ordered::OrderedIndex;
use super::records::Records;
use super::RepoResult;
use crate::codec::CollectionKind;
use crate::db::{Store, Tx};
use crate::model::area::{Area, Thing};
use crate::model::item::{Item, ItemId};
use crate::model::list::List;
use crate::model::user::User;

pub struct DataTx<'s> {
    raw: Tx<'s>,
}

impl<'s> DataTx<'s> {
    /// Begins a read-only data transaction.
    pub fn view(store: &'s Store) -> RepoResult<Self> {
        Ok(Self { raw: store.view()? })
    }

    /// Begins a read-write data transaction.
    pub fn update(store: &'s Store) -> RepoResult<Self> {
        Ok(Self {
            raw: store.update()?,
        })
    }

    /// Underlying key-value transaction.
    pub fn raw(&self) -> &Tx<'s> {
        &self.raw
    }

    pub fn items(&self) -> Records<'_, Item> {
        Records::new(&self.raw)
    }

    pub fn lists(&self) -> Records<'_, List> {
        Records::new(&self.raw)
    }

    pub fn users(&self) -> Records<'_, User> {
        Records::new(&self.raw)
    }

    pub fn areas(&self) -> Records<'_, Area> {
        Records::new(&self.raw)
    }

    /// Item order of every list.
    pub fn list_items(&self) -> OrderedIndex<'_, ItemId> {
        OrderedIndex::new(&self.raw, CollectionKind::ListItems)
    }

    /// Member order of every area.
    pub fn area_members(&self) -> OrderedIndex<'_, Thing> {
        OrderedIndex::new(&self.raw, CollectionKind::AreaMembers)
    }

    /// Per-user focus buckets.
    pub fn focus(&self) -> FocusIndex<'_> {
        FocusIndex::new(&self.raw)
    }

    /// Commits an update transaction or releases a view transaction.
    pub fn close(self) -> RepoResult<()> {
        self.raw.close()?;
        Ok(())
    }

    /// Discards every write made through this transaction.
    pub fn rollback(self) -> RepoResult<()> {
        self.raw.rollback()?;
        Ok(())
    }
}
