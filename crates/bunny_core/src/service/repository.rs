//! Entity repository facade.
//!
//! # Responsibility
//! - Expose the operations the rendering/routing layers call.
//! - Run each operation in exactly one store transaction.
//! - Check referenced entities exist before mutating anything.
//!
//! # Invariants
//! - Deleting an item or list removes it from every ordered collection.
//! - Bulk reads skip members whose records fail to load; writes never do.

use crate::codec::{CollectionKey, Position};
use crate::db::Store;
use crate::model::area::{Area, AreaEntry, AreaId, Thing};
use crate::model::item::{Item, ItemId, ItemState, UserItem};
use crate::model::list::{List, ListId};
use crate::model::user::{FocusBucket, FocusData, User, UserId};
use crate::repo::ordered::PositionEntry;
use crate::repo::tx::DataTx;
use crate::repo::RepoResult;
use log::{info, warn};

/// List every new demo item lands in.
pub const DEMO_LIST: ListId = 1;
/// User owning the demo focus buckets.
pub const DEMO_USER: UserId = 1;

pub struct EntityRepository<'s> {
    store: &'s Store,
}

impl<'s> EntityRepository<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'s Store {
        self.store
    }

    // ---- items ----

    pub fn item_by_id(&self, id: ItemId) -> RepoResult<Item> {
        let tx = DataTx::view(self.store)?;
        let item = tx.items().get(id)?;
        tx.close()?;
        Ok(item)
    }

    /// Loads an item annotated with `user`'s focus on it.
    pub fn user_item_by_id(&self, user: UserId, id: ItemId) -> RepoResult<UserItem> {
        let tx = DataTx::view(self.store)?;
        tx.users().ensure_exists(user)?;
        let item = tx.items().get(id)?;
        let focus = tx.focus().bucket_of(user, id)?.map(|(bucket, _)| bucket);
        tx.close()?;
        Ok(UserItem { item, focus })
    }

    /// Overwrites an existing item; fails with `NotFound` for unknown ids.
    pub fn set_item(&self, item: &Item) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.items().set(item)?;
        tx.close()
    }

    pub fn force_set_item(&self, item: &Item) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.items().force_set(item)?;
        tx.close()
    }

    /// Creates an empty open item under the next free id.
    pub fn new_item(&self) -> RepoResult<Item> {
        let tx = DataTx::update(self.store)?;
        let item = tx.items().insert_new(Item::default())?;
        tx.close()?;
        info!("event=item_create module=service status=ok item={}", item.id);
        Ok(item)
    }

    /// Creates an empty item and places it at `position` of `list` atomically.
    pub fn new_list_item(&self, list: ListId, position: Position) -> RepoResult<Item> {
        let tx = DataTx::update(self.store)?;
        tx.lists().ensure_exists(list)?;
        let item = tx.items().insert_new(Item::default())?;
        tx.list_items()
            .set_position(CollectionKey::List(list), item.id, position)?;
        tx.close()?;
        info!(
            "event=item_create module=service status=ok item={} list={list} position={position}",
            item.id
        );
        Ok(item)
    }

    /// Deletes an item and removes it from every list, focus bucket and area.
    pub fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.items().ensure_exists(id)?;

        let list_items = tx.list_items();
        let lists = list_items.collections_of(&id)?;
        for (collection, _) in &lists {
            list_items.remove(*collection, &id)?;
        }
        let buckets = tx.focus().remove_item(id)?;
        let area_members = tx.area_members();
        let areas = area_members.collections_of(&Thing::Item(id))?;
        for (collection, _) in &areas {
            area_members.remove(*collection, &Thing::Item(id))?;
        }
        tx.items().delete(id)?;
        tx.close()?;

        info!(
            "event=item_delete module=service status=ok item={id} lists={} buckets={buckets} areas={}",
            lists.len(),
            areas.len()
        );
        Ok(())
    }

    // ---- lists ----

    pub fn list_by_id(&self, id: ListId) -> RepoResult<List> {
        let tx = DataTx::view(self.store)?;
        let list = tx.lists().get(id)?;
        tx.close()?;
        Ok(list)
    }

    pub fn set_list(&self, list: &List) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.lists().set(list)?;
        tx.close()
    }

    pub fn force_set_list(&self, list: &List) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.lists().force_set(list)?;
        tx.close()
    }

    pub fn new_list(&self, title: &str) -> RepoResult<List> {
        let tx = DataTx::update(self.store)?;
        let list = tx.lists().insert_new(List::new(0, title))?;
        tx.close()?;
        info!("event=list_create module=service status=ok list={}", list.id);
        Ok(list)
    }

    /// Deletes a list, its item order and its area memberships. Items survive.
    pub fn delete_list(&self, id: ListId) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.lists().ensure_exists(id)?;
        let cleared = tx.list_items().clear(CollectionKey::List(id))?;
        let area_members = tx.area_members();
        for (collection, _) in area_members.collections_of(&Thing::List(id))? {
            area_members.remove(collection, &Thing::List(id))?;
        }
        tx.lists().delete(id)?;
        tx.close()?;
        info!("event=list_delete module=service status=ok list={id} items={cleared}");
        Ok(())
    }

    /// Items of `list` in position order.
    pub fn list_items(&self, list: ListId) -> RepoResult<Vec<Item>> {
        let tx = DataTx::view(self.store)?;
        tx.lists().ensure_exists(list)?;
        let items = tx.items();
        let mut out = Vec::new();
        for id in tx.list_items().members(CollectionKey::List(list))? {
            match items.get(id) {
                Ok(item) => out.push(item),
                Err(err) => warn!(
                    "event=list_join module=service status=skipped list={list} item={id} error={err}"
                ),
            }
        }
        tx.close()?;
        Ok(out)
    }

    /// Items of `list` in position order, each annotated with `user`'s focus.
    pub fn user_list_items(&self, user: UserId, list: ListId) -> RepoResult<Vec<UserItem>> {
        let tx = DataTx::view(self.store)?;
        tx.users().ensure_exists(user)?;
        tx.lists().ensure_exists(list)?;
        let items = tx.items();
        let focus = tx.focus();
        let mut out = Vec::new();
        for id in tx.list_items().members(CollectionKey::List(list))? {
            let joined = items.get(id).and_then(|item| {
                let bucket = focus.bucket_of(user, id)?.map(|(bucket, _)| bucket);
                Ok(UserItem {
                    item,
                    focus: bucket,
                })
            });
            match joined {
                Ok(entry) => out.push(entry),
                Err(err) => warn!(
                    "event=list_join module=service status=skipped list={list} user={user} item={id} error={err}"
                ),
            }
        }
        tx.close()?;
        Ok(out)
    }

    /// Raw position entries of `list`, for inspection and consistency checks.
    pub fn list_positions(&self, list: ListId) -> RepoResult<Vec<PositionEntry<ItemId>>> {
        let tx = DataTx::view(self.store)?;
        tx.lists().ensure_exists(list)?;
        let entries = tx.list_items().entries(CollectionKey::List(list))?;
        tx.close()?;
        Ok(entries)
    }

    /// Inserts `item` into `list` at `position`, or moves it there.
    pub fn set_list_item_position(
        &self,
        list: ListId,
        item: ItemId,
        position: Position,
    ) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.lists().ensure_exists(list)?;
        tx.items().ensure_exists(item)?;
        tx.list_items()
            .set_position(CollectionKey::List(list), item, position)?;
        tx.close()
    }

    /// Takes `item` out of `list`. Returns whether it was a member.
    pub fn remove_list_item(&self, list: ListId, item: ItemId) -> RepoResult<bool> {
        let tx = DataTx::update(self.store)?;
        tx.lists().ensure_exists(list)?;
        let removed = tx.list_items().remove(CollectionKey::List(list), &item)?;
        tx.close()?;
        Ok(removed)
    }

    // ---- users and focus ----

    pub fn user_by_id(&self, id: UserId) -> RepoResult<User> {
        let tx = DataTx::view(self.store)?;
        let user = tx.users().get(id)?;
        tx.close()?;
        Ok(user)
    }

    pub fn force_set_user(&self, user: &User) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.users().force_set(user)?;
        tx.close()
    }

    pub fn new_user(&self, name: &str) -> RepoResult<User> {
        let tx = DataTx::update(self.store)?;
        let user = tx.users().insert_new(User::new(0, name))?;
        tx.close()?;
        info!("event=user_create module=service status=ok user={}", user.id);
        Ok(user)
    }

    /// Toggles `user`'s focus on `item`: the bucket it already occupies clears
    /// it, any other bucket moves it there (demoting a previous `Now`).
    ///
    /// Returns the resulting bucket.
    pub fn set_user_focus(
        &self,
        user: UserId,
        item: ItemId,
        bucket: FocusBucket,
    ) -> RepoResult<Option<FocusBucket>> {
        let tx = DataTx::update(self.store)?;
        tx.users().ensure_exists(user)?;
        tx.items().ensure_exists(item)?;
        let result = tx.focus().toggle(user, item, bucket)?;
        tx.close()?;
        Ok(result)
    }

    /// Removes any focus `user` has on `item`. Returns the bucket it left.
    pub fn clear_user_focus(&self, user: UserId, item: ItemId) -> RepoResult<Option<FocusBucket>> {
        let tx = DataTx::update(self.store)?;
        tx.users().ensure_exists(user)?;
        let previous = tx.focus().clear(user, item)?;
        tx.close()?;
        Ok(previous)
    }

    /// Reorders `item` inside the focus bucket it occupies.
    pub fn set_focus_position(
        &self,
        user: UserId,
        item: ItemId,
        position: Position,
    ) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.users().ensure_exists(user)?;
        tx.focus().set_position(user, item, position)?;
        tx.close()
    }

    pub fn focus_list(&self, user: UserId) -> RepoResult<FocusData> {
        let tx = DataTx::view(self.store)?;
        tx.users().ensure_exists(user)?;
        let data = tx.focus().all_by_user(user)?;
        tx.close()?;
        Ok(data)
    }

    // ---- areas ----

    pub fn area_by_id(&self, id: AreaId) -> RepoResult<Area> {
        let tx = DataTx::view(self.store)?;
        let area = tx.areas().get(id)?;
        tx.close()?;
        Ok(area)
    }

    pub fn set_area(&self, area: &Area) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.areas().set(area)?;
        tx.close()
    }

    pub fn force_set_area(&self, area: &Area) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.areas().force_set(area)?;
        tx.close()
    }

    pub fn new_area(&self, title: &str) -> RepoResult<Area> {
        let tx = DataTx::update(self.store)?;
        let area = tx.areas().insert_new(Area::new(0, title))?;
        tx.close()?;
        info!("event=area_create module=service status=ok area={}", area.id);
        Ok(area)
    }

    /// Deletes an area and its member order. Members survive.
    pub fn delete_area(&self, id: AreaId) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.areas().ensure_exists(id)?;
        tx.area_members().clear(CollectionKey::Area(id))?;
        tx.areas().delete(id)?;
        tx.close()
    }

    /// Members of `area` in position order, resolved to their records.
    pub fn area_entries(&self, area: AreaId) -> RepoResult<Vec<AreaEntry>> {
        let tx = DataTx::view(self.store)?;
        tx.areas().ensure_exists(area)?;
        let mut out = Vec::new();
        for thing in tx.area_members().members(CollectionKey::Area(area))? {
            let resolved = match thing {
                Thing::Item(id) => tx.items().get(id).map(AreaEntry::Item),
                Thing::List(id) => tx.lists().get(id).map(AreaEntry::List),
            };
            match resolved {
                Ok(entry) => out.push(entry),
                Err(err) => warn!(
                    "event=area_join module=service status=skipped area={area} thing={thing} error={err}"
                ),
            }
        }
        tx.close()?;
        Ok(out)
    }

    /// Inserts `thing` into `area` at `position`, or moves it there.
    pub fn set_area_position(
        &self,
        area: AreaId,
        thing: Thing,
        position: Position,
    ) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.areas().ensure_exists(area)?;
        match thing {
            Thing::Item(id) => tx.items().ensure_exists(id)?,
            Thing::List(id) => tx.lists().ensure_exists(id)?,
        }
        tx.area_members()
            .set_position(CollectionKey::Area(area), thing, position)?;
        tx.close()
    }

    /// Takes `thing` out of `area`. Returns whether it was a member.
    pub fn remove_area_member(&self, area: AreaId, thing: Thing) -> RepoResult<bool> {
        let tx = DataTx::update(self.store)?;
        tx.areas().ensure_exists(area)?;
        let removed = tx
            .area_members()
            .remove(CollectionKey::Area(area), &thing)?;
        tx.close()?;
        Ok(removed)
    }

    // ---- demo data ----

    /// Writes the demo user, five items in list 1 and three focused items.
    ///
    /// Safe to run on a store that already holds the demo data.
    pub fn seed_demo_data(&self) -> RepoResult<()> {
        let tx = DataTx::update(self.store)?;
        tx.users().force_set(&User::new(DEMO_USER, "martin"))?;

        let items = [
            Item::new(1, "Hello world!", "Let's have some fun with bunny!"),
            Item::new(2, "Look at Bunny", "Reading this already completed it.")
                .with_state(ItemState::Complete),
            Item::new(
                3,
                "Somebody else does it",
                "Interesting to follow, but not mine to work on.",
            ),
            Item::new(4, "Nevermind me, I'm old", "Done and no longer relevant.")
                .with_state(ItemState::Archived),
            Item::new(
                5,
                "I started it but don't know how to finish",
                "Somebody please help me complete this item.",
            ),
        ];
        for item in &items {
            tx.items().force_set(item)?;
        }

        tx.lists().force_set(&List::new(DEMO_LIST, "Inbox"))?;
        let list_items = tx.list_items();
        for (position, item) in (1..).zip(&items) {
            list_items.set_position(CollectionKey::List(DEMO_LIST), item.id, position)?;
        }

        let focus = tx.focus();
        focus.set_focus(DEMO_USER, 1, FocusBucket::Now)?;
        focus.set_focus(DEMO_USER, 2, FocusBucket::Later)?;
        focus.set_focus(DEMO_USER, 3, FocusBucket::Watch)?;
        tx.close()?;

        info!(
            "event=seed_demo module=service status=ok items={} list={DEMO_LIST} user={DEMO_USER}",
            items.len()
        );
        Ok(())
    }
}
