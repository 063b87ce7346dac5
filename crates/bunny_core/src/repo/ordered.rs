//! Dense ordered collections on top of the sorted key-value store.
//!
//! # Responsibility
//! - Keep the member order of lists, focus buckets and areas.
//! - Insert, move and remove members by rewriting only the shifted slots.
//!
//! # Invariants
//! - A collection with N members occupies exactly positions `1..=N`.
//! - A member occupies at most one slot per collection.
//! - Every slot `p` holding member `m` has a membership entry `m -> p`.
//!
//! Every operation runs inside the caller's transaction, so a failure part
//! way through a shift leaves nothing behind once that transaction rolls back.

use super::{RepoError, RepoResult};
use crate::codec::key::{
    membership_key, membership_range, parse_membership_key, parse_position_key, position_key,
    position_range, position_span,
};
use crate::codec::{decode, encode, CollectionKey, CollectionKind, MemberKey, Position};
use crate::db::Tx;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::marker::PhantomData;

/// Value that can occupy a slot of an ordered collection.
pub trait Member: MemberKey + Serialize + DeserializeOwned + Copy + Eq + Display {}

impl<T> Member for T where T: MemberKey + Serialize + DeserializeOwned + Copy + Eq + Display {}

/// One occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEntry<M> {
    pub position: Position,
    pub member: M,
}

/// Ordered collections of one kind, accessed through one transaction.
pub struct OrderedIndex<'a, M> {
    tx: &'a Tx<'a>,
    kind: CollectionKind,
    _member: PhantomData<M>,
}

impl<'a, M: Member> OrderedIndex<'a, M> {
    pub(crate) fn new(tx: &'a Tx<'a>, kind: CollectionKind) -> Self {
        Self {
            tx,
            kind,
            _member: PhantomData,
        }
    }

    /// Number of members; equal to the highest occupied position.
    pub fn len(&self, collection: CollectionKey) -> RepoResult<Position> {
        self.check_kind(collection);
        let last = self.tx.descend(&position_range(collection), Some(1))?;
        match last.first() {
            Some((key, _)) => Ok(parse_position_key(key)?.1),
            None => Ok(0),
        }
    }

    /// Every occupied slot in ascending position order.
    pub fn entries(&self, collection: CollectionKey) -> RepoResult<Vec<PositionEntry<M>>> {
        self.check_kind(collection);
        self.decode_slots(self.tx.ascend(&position_range(collection), None)?)
    }

    /// Members in position order.
    pub fn members(&self, collection: CollectionKey) -> RepoResult<Vec<M>> {
        Ok(self
            .entries(collection)?
            .into_iter()
            .map(|entry| entry.member)
            .collect())
    }

    pub fn member_at(&self, collection: CollectionKey, position: Position) -> RepoResult<Option<M>> {
        self.check_kind(collection);
        let key = position_key(collection, position);
        match self.tx.get(&key)? {
            Some(raw) => Ok(Some(decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    /// Current slot of `member`, if it belongs to `collection`.
    pub fn position_of(&self, collection: CollectionKey, member: &M) -> RepoResult<Option<Position>> {
        self.check_kind(collection);
        let key = membership_key(collection, member);
        match self.tx.get(&key)? {
            Some(raw) => Ok(Some(decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, collection: CollectionKey, member: &M) -> RepoResult<bool> {
        Ok(self.position_of(collection, member)?.is_some())
    }

    /// Every collection of this kind holding `member`, with its slot there.
    pub fn collections_of(&self, member: &M) -> RepoResult<Vec<(CollectionKey, Position)>> {
        let entries = self.tx.ascend(&membership_range(self.kind, member), None)?;
        entries
            .iter()
            .map(|(key, raw)| -> RepoResult<(CollectionKey, Position)> {
                let (_, collection) = parse_membership_key::<M>(key)?;
                let position: Position = decode(key, raw)?;
                Ok((collection, position))
            })
            .collect()
    }

    /// Places `member` at 1-based `target`, inserting it when absent.
    ///
    /// Members between the old and the new slot shift by one so the
    /// collection stays dense. A member already at `target` is left alone.
    ///
    /// # Errors
    /// - `Range` when `target` is outside `1..=len` (`1..=len+1` for inserts).
    pub fn set_position(
        &self,
        collection: CollectionKey,
        member: M,
        target: Position,
    ) -> RepoResult<()> {
        let len = self.len(collection)?;
        let current = self.position_of(collection, &member)?;

        // An absent member enters from just past the end.
        let (from, len) = match current {
            Some(position) => (position, len),
            None => {
                let grown = len.checked_add(1).ok_or(RepoError::Range {
                    position: target,
                    max: len,
                })?;
                (grown, grown)
            }
        };

        if target < 1 || target > len {
            return Err(RepoError::Range {
                position: target,
                max: len,
            });
        }
        if current == Some(target) {
            debug!(
                "event=set_position module=repo status=noop collection={collection} member={member} position={target}"
            );
            return Ok(());
        }

        if target < from {
            let shifted = self.span(collection, target, from - 1)?;
            for entry in shifted.iter().rev() {
                self.write_slot(collection, entry.position + 1, &entry.member)?;
            }
        } else if target > from {
            let shifted = self.span(collection, from + 1, target)?;
            for entry in &shifted {
                self.write_slot(collection, entry.position - 1, &entry.member)?;
            }
        }
        self.write_slot(collection, target, &member)?;

        debug!(
            "event=set_position module=repo status=ok collection={collection} member={member} from={from} to={target} len={len}"
        );
        Ok(())
    }

    /// Moves `member` to the last slot, inserting it when absent.
    pub fn append(&self, collection: CollectionKey, member: M) -> RepoResult<Position> {
        let len = self.len(collection)?;
        let target = if self.contains(collection, &member)? {
            len
        } else {
            len + 1
        };
        self.set_position(collection, member, target)?;
        Ok(target)
    }

    /// Removes `member` and closes the gap. Returns whether it was present.
    ///
    /// The member is first shifted to the tail with the same move used by
    /// `set_position`, then the vacated tail slot is dropped.
    pub fn remove(&self, collection: CollectionKey, member: &M) -> RepoResult<bool> {
        if !self.contains(collection, member)? {
            return Ok(false);
        }
        let len = self.len(collection)?;
        self.set_position(collection, *member, len)?;
        self.tx.delete(&position_key(collection, len))?;
        self.tx.delete(&membership_key(collection, member))?;

        debug!(
            "event=remove_member module=repo status=ok collection={collection} member={member} len={}",
            len - 1
        );
        Ok(true)
    }

    /// Drops every member of `collection`. Returns how many were removed.
    pub fn clear(&self, collection: CollectionKey) -> RepoResult<usize> {
        let entries = self.entries(collection)?;
        for entry in &entries {
            self.tx.delete(&position_key(collection, entry.position))?;
            self.tx.delete(&membership_key(collection, &entry.member))?;
        }
        Ok(entries.len())
    }

    fn span(
        &self,
        collection: CollectionKey,
        from: Position,
        to: Position,
    ) -> RepoResult<Vec<PositionEntry<M>>> {
        self.decode_slots(self.tx.ascend(&position_span(collection, from, to), None)?)
    }

    fn write_slot(&self, collection: CollectionKey, position: Position, member: &M) -> RepoResult<()> {
        self.tx.set(&position_key(collection, position), &encode(member)?)?;
        self.tx.set(&membership_key(collection, member), &encode(&position)?)?;
        Ok(())
    }

    fn decode_slots(&self, slots: Vec<(String, String)>) -> RepoResult<Vec<PositionEntry<M>>> {
        slots
            .iter()
            .map(|(key, raw)| -> RepoResult<PositionEntry<M>> {
                let (_, position) = parse_position_key(key)?;
                let member = decode(key, raw)?;
                Ok(PositionEntry { position, member })
            })
            .collect()
    }

    fn check_kind(&self, collection: CollectionKey) {
        debug_assert_eq!(
            collection.kind(),
            self.kind,
            "collection {collection} used through the wrong index"
        );
    }
}
