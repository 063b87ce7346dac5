//! Per-user focus buckets.
//!
//! # Responsibility
//! - Classify items per user into ordered `Now`, `Later` and `Watch` buckets.
//! - Resolve buckets into items for display.
//!
//! # Invariants
//! - `Now` holds at most one item. Focusing a second item moves the previous
//!   one to the end of `Later`; nothing is ever dropped by that cascade.
//! - An item sits in at most one bucket of a given user.
//! - Each bucket is a dense ordered collection (see [`super::ordered`]).

use super::ordered::OrderedIndex;
use super::records::Records;
use super::{RepoError, RepoResult};
use crate::codec::key::{focus_membership_range, parse_membership_key};
use crate::codec::{decode, CollectionKey, CollectionKind, Position};
use crate::db::Tx;
use crate::model::item::{Item, ItemId};
use crate::model::user::{FocusBucket, FocusData, UserId};
use log::{info, warn};

pub struct FocusIndex<'a> {
    tx: &'a Tx<'a>,
    buckets: OrderedIndex<'a, ItemId>,
    items: Records<'a, Item>,
}

fn bucket_key(user: UserId, bucket: FocusBucket) -> CollectionKey {
    CollectionKey::Focus { user, bucket }
}

impl<'a> FocusIndex<'a> {
    pub(crate) fn new(tx: &'a Tx<'a>) -> Self {
        Self {
            tx,
            buckets: OrderedIndex::new(tx, CollectionKind::UserFocus),
            items: Records::new(tx),
        }
    }

    /// Bucket and slot currently holding `item` for `user`.
    pub fn bucket_of(
        &self,
        user: UserId,
        item: ItemId,
    ) -> RepoResult<Option<(FocusBucket, Position)>> {
        let entries = self.tx.ascend(&focus_membership_range(user, item), None)?;
        let (key, raw) = match entries.as_slice() {
            [] => return Ok(None),
            [entry] => entry,
            _ => {
                return Err(RepoError::CorruptIndex(format!(
                    "item {item} is in {} focus buckets of user {user}",
                    entries.len()
                )))
            }
        };
        let (_, collection) = parse_membership_key::<ItemId>(key)?;
        let CollectionKey::Focus { bucket, .. } = collection else {
            return Err(RepoError::CorruptIndex(format!(
                "focus membership `{key}` names {collection}"
            )));
        };
        let position: Position = decode(key, raw)?;
        Ok(Some((bucket, position)))
    }

    /// Item ids of one bucket in position order.
    pub fn members(&self, user: UserId, bucket: FocusBucket) -> RepoResult<Vec<ItemId>> {
        self.buckets.members(bucket_key(user, bucket))
    }

    /// Moves `item` to the end of `bucket`, taking it out of any other bucket.
    ///
    /// When `bucket` is `Now` and another item holds it, that item is demoted
    /// to the end of `Later` first.
    pub fn set_focus(&self, user: UserId, item: ItemId, bucket: FocusBucket) -> RepoResult<()> {
        self.clear(user, item)?;

        if bucket == FocusBucket::Now {
            let now = bucket_key(user, FocusBucket::Now);
            for current in self.buckets.members(now)? {
                self.buckets.remove(now, &current)?;
                let position = self
                    .buckets
                    .append(bucket_key(user, FocusBucket::Later), current)?;
                info!(
                    "event=focus_demote module=repo status=ok user={user} item={current} bucket=later position={position}"
                );
            }
        }

        let position = self.buckets.append(bucket_key(user, bucket), item)?;
        info!(
            "event=set_focus module=repo status=ok user={user} item={item} bucket={bucket} position={position}"
        );
        Ok(())
    }

    /// Caller-facing toggle: focusing an item into the bucket it already
    /// occupies clears its focus, any other bucket moves it there.
    ///
    /// Returns the resulting bucket.
    pub fn toggle(
        &self,
        user: UserId,
        item: ItemId,
        bucket: FocusBucket,
    ) -> RepoResult<Option<FocusBucket>> {
        match self.bucket_of(user, item)? {
            Some((current, _)) if current == bucket => {
                self.clear(user, item)?;
                Ok(None)
            }
            _ => {
                self.set_focus(user, item, bucket)?;
                Ok(Some(bucket))
            }
        }
    }

    /// Removes `item` from whichever bucket holds it. Returns that bucket.
    pub fn clear(&self, user: UserId, item: ItemId) -> RepoResult<Option<FocusBucket>> {
        let Some((bucket, _)) = self.bucket_of(user, item)? else {
            return Ok(None);
        };
        self.buckets.remove(bucket_key(user, bucket), &item)?;
        Ok(Some(bucket))
    }

    /// Reorders `item` inside the bucket it currently occupies.
    ///
    /// # Errors
    /// - `NotInCollection` when `item` has no focus for `user`.
    /// - `Range` when `position` is outside the bucket.
    pub fn set_position(&self, user: UserId, item: ItemId, position: Position) -> RepoResult<()> {
        let Some((bucket, _)) = self.bucket_of(user, item)? else {
            return Err(RepoError::NotInCollection {
                collection: format!("focus buckets of user {user}"),
                member: format!("item {item}"),
            });
        };
        self.buckets
            .set_position(bucket_key(user, bucket), item, position)
    }

    /// Drops `item` from every bucket of every user. Returns how many
    /// buckets held it.
    pub fn remove_item(&self, item: ItemId) -> RepoResult<usize> {
        let holders = self.buckets.collections_of(&item)?;
        for (collection, _) in &holders {
            self.buckets.remove(*collection, &item)?;
        }
        Ok(holders.len())
    }

    /// Resolves every bucket of `user` into items, in position order.
    ///
    /// A member whose item record cannot be loaded is logged and skipped so
    /// one bad record does not hide the rest of the focus list.
    pub fn all_by_user(&self, user: UserId) -> RepoResult<FocusData> {
        let mut data = FocusData::default();
        for bucket in FocusBucket::ALL {
            for id in self.members(user, bucket)? {
                let item = match self.items.get(id) {
                    Ok(item) => item,
                    Err(err) => {
                        warn!(
                            "event=focus_join module=repo status=skipped user={user} item={id} bucket={bucket} error={err}"
                        );
                        continue;
                    }
                };
                match bucket {
                    FocusBucket::Now => data.now = Some(item),
                    FocusBucket::Later => data.later.push(item),
                    FocusBucket::Watch => data.watch.push(item),
                }
            }
        }
        Ok(data)
    }
}
