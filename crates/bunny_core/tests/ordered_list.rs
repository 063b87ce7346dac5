use bunny_core::codec::CollectionKey;
use bunny_core::db::open_store_in_memory;
use bunny_core::repo::tx::DataTx;
use bunny_core::{
    Area, EntityRepository, ErrorKind, Item, ItemId, List, ListId, RepoError, Store, StoreConfig,
    Thing,
};
use proptest::prelude::*;

const LIST: ListId = 1;

fn setup() -> Store {
    open_store_in_memory(&StoreConfig::default()).unwrap()
}

/// Creates items `1..=count` and list 1 holding them in id order.
fn list_with_items(store: &Store, count: u64) {
    let repo = EntityRepository::new(store);
    repo.force_set_list(&List::new(LIST, "Ordered")).unwrap();
    for id in 1..=count {
        repo.force_set_item(&Item::new(id, format!("item {id}"), ""))
            .unwrap();
        repo.set_list_item_position(LIST, id, id as u32).unwrap();
    }
}

fn order(store: &Store) -> Vec<ItemId> {
    let entries = EntityRepository::new(store).list_positions(LIST).unwrap();
    entries.iter().map(|entry| entry.member).collect()
}

/// Asserts positions are exactly `1..=N` and every membership entry agrees.
fn assert_dense(store: &Store) {
    let entries = EntityRepository::new(store).list_positions(LIST).unwrap();
    let positions: Vec<u32> = entries.iter().map(|entry| entry.position).collect();
    let expected: Vec<u32> = (1..=entries.len() as u32).collect();
    assert_eq!(positions, expected);

    let tx = DataTx::view(store).unwrap();
    let index = tx.list_items();
    assert_eq!(index.len(CollectionKey::List(LIST)).unwrap(), entries.len() as u32);
    let past_end = entries.len() as u32 + 1;
    assert_eq!(
        index
            .member_at(CollectionKey::List(LIST), past_end)
            .unwrap(),
        None
    );
    for entry in &entries {
        assert_eq!(
            index
                .position_of(CollectionKey::List(LIST), &entry.member)
                .unwrap(),
            Some(entry.position)
        );
        assert_eq!(
            index
                .member_at(CollectionKey::List(LIST), entry.position)
                .unwrap(),
            Some(entry.member)
        );
        let holders = index.collections_of(&entry.member).unwrap();
        assert!(holders.contains(&(CollectionKey::List(LIST), entry.position)));
    }
    tx.close().unwrap();
}

#[test]
fn moves_and_inserts_match_expected_orders() {
    let cases: [(ItemId, u32, &[ItemId]); 10] = [
        (2, 1, &[2, 1, 3, 4, 5]),
        (3, 4, &[1, 2, 4, 3, 5]),
        (1, 2, &[2, 1, 3, 4, 5]),
        (3, 1, &[3, 1, 2, 4, 5]),
        (2, 4, &[1, 3, 4, 2, 5]),
        (1, 5, &[2, 3, 4, 5, 1]),
        (5, 1, &[5, 1, 2, 3, 4]),
        (6, 1, &[6, 1, 2, 3, 4, 5]),
        (6, 6, &[1, 2, 3, 4, 5, 6]),
        (6, 3, &[1, 2, 6, 3, 4, 5]),
    ];

    for (item, target, expected) in cases {
        let store = setup();
        list_with_items(&store, 5);
        let repo = EntityRepository::new(&store);
        repo.force_set_item(&Item::new(6, "item 6", "")).unwrap();

        repo.set_list_item_position(LIST, item, target).unwrap();

        assert_eq!(order(&store), expected, "item {item} to {target}");
        assert_dense(&store);
    }
}

#[test]
fn moving_to_current_position_changes_nothing() {
    let store = setup();
    list_with_items(&store, 5);
    let repo = EntityRepository::new(&store);

    repo.set_list_item_position(LIST, 4, 2).unwrap();
    let once = order(&store);
    repo.set_list_item_position(LIST, 4, 2).unwrap();

    assert_eq!(order(&store), once);
    assert_eq!(once, vec![1, 4, 2, 3, 5]);
    assert_dense(&store);
}

#[test]
fn out_of_range_targets_are_rejected_without_changes() {
    let store = setup();
    list_with_items(&store, 5);
    let repo = EntityRepository::new(&store);
    repo.force_set_item(&Item::new(6, "item 6", "")).unwrap();

    for (item, target, max) in [(3, 0, 5), (3, 6, 5), (6, 0, 6), (6, 7, 6)] {
        let err = repo.set_list_item_position(LIST, item, target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        match err {
            RepoError::Range { position, max: got } => {
                assert_eq!(position, target);
                assert_eq!(got, max);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(order(&store), vec![1, 2, 3, 4, 5]);
    }
    assert_dense(&store);
}

#[test]
fn new_list_item_out_of_range_creates_nothing() {
    let store = setup();
    list_with_items(&store, 3);
    let repo = EntityRepository::new(&store);

    let err = repo.new_list_item(LIST, 9).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert_eq!(repo.item_by_id(4).unwrap_err().kind(), ErrorKind::NotFound);

    let created = repo.new_list_item(LIST, 1).unwrap();
    assert_eq!(created.id, 4);
    assert_eq!(order(&store), vec![4, 1, 2, 3]);
}

#[test]
fn removing_members_closes_gaps() {
    let store = setup();
    list_with_items(&store, 5);
    let repo = EntityRepository::new(&store);

    assert!(repo.remove_list_item(LIST, 3).unwrap());
    assert_eq!(order(&store), vec![1, 2, 4, 5]);
    assert_dense(&store);

    assert!(repo.remove_list_item(LIST, 5).unwrap());
    assert!(repo.remove_list_item(LIST, 1).unwrap());
    assert_eq!(order(&store), vec![2, 4]);
    assert_dense(&store);

    assert!(!repo.remove_list_item(LIST, 3).unwrap());
    assert_eq!(repo.item_by_id(3).unwrap().id, 3);
}

#[test]
fn deleting_an_item_shrinks_every_list_holding_it() {
    let store = setup();
    list_with_items(&store, 4);
    let repo = EntityRepository::new(&store);
    let other = repo.new_list("Other").unwrap();
    repo.set_list_item_position(other.id, 2, 1).unwrap();
    repo.set_list_item_position(other.id, 4, 1).unwrap();

    repo.delete_item(2).unwrap();

    assert_eq!(order(&store), vec![1, 3, 4]);
    let other_items: Vec<ItemId> = repo
        .list_items(other.id)
        .unwrap()
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(other_items, vec![4]);
    assert_dense(&store);
    assert_eq!(repo.delete_item(2).unwrap_err().kind(), ErrorKind::NotFound);
}

/// One generated step: `(item, target seed, remove instead of place)`.
fn step_strategy() -> impl Strategy<Value = (ItemId, u32, bool)> {
    (1u64..=12, any::<u32>(), prop::bool::weighted(0.2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn generated_operations_keep_the_collection_dense(
        steps in prop::collection::vec(step_strategy(), 1..80),
    ) {
        let store = setup();
        let repo = EntityRepository::new(&store);
        repo.force_set_list(&List::new(LIST, "Shuffled")).unwrap();
        for id in 1..=12 {
            repo.force_set_item(&Item::new(id, format!("item {id}"), ""))
                .unwrap();
        }

        let mut model: Vec<ItemId> = Vec::new();
        for (item, seed, remove) in steps {
            if remove {
                let removed = repo.remove_list_item(LIST, item).unwrap();
                prop_assert_eq!(removed, model.contains(&item));
                model.retain(|&member| member != item);
            } else {
                let max = if model.contains(&item) {
                    model.len()
                } else {
                    model.len() + 1
                };
                let target = seed % max as u32 + 1;
                repo.set_list_item_position(LIST, item, target).unwrap();
                model.retain(|&member| member != item);
                model.insert(target as usize - 1, item);
            }
            prop_assert_eq!(order(&store), model.clone());
            assert_dense(&store);
        }
    }
}

#[test]
fn dropped_transaction_leaves_order_untouched() {
    let store = setup();
    list_with_items(&store, 5);

    {
        let tx = DataTx::update(&store).unwrap();
        tx.list_items()
            .set_position(CollectionKey::List(LIST), 5, 1)
            .unwrap();
        tx.list_items()
            .remove(CollectionKey::List(LIST), &2)
            .unwrap();
    }
    assert_eq!(order(&store), vec![1, 2, 3, 4, 5]);

    let tx = DataTx::update(&store).unwrap();
    tx.list_items().clear(CollectionKey::List(LIST)).unwrap();
    tx.rollback().unwrap();
    assert_eq!(order(&store), vec![1, 2, 3, 4, 5]);
    assert_dense(&store);
}

#[test]
fn areas_order_items_and_lists_together() {
    let store = setup();
    list_with_items(&store, 3);
    let repo = EntityRepository::new(&store);
    let area = repo.new_area("Home").unwrap();
    assert_eq!(area, Area::new(1, "Home"));

    repo.set_area_position(area.id, Thing::Item(2), 1).unwrap();
    repo.set_area_position(area.id, Thing::List(LIST), 2).unwrap();
    repo.set_area_position(area.id, Thing::Item(3), 1).unwrap();

    let things: Vec<Thing> = repo
        .area_entries(area.id)
        .unwrap()
        .iter()
        .map(|entry| entry.thing())
        .collect();
    assert_eq!(
        things,
        vec![Thing::Item(3), Thing::Item(2), Thing::List(LIST)]
    );

    let missing = repo
        .set_area_position(area.id, Thing::List(42), 1)
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    repo.delete_list(LIST).unwrap();
    repo.delete_item(3).unwrap();
    let things: Vec<Thing> = repo
        .area_entries(area.id)
        .unwrap()
        .iter()
        .map(|entry| entry.thing())
        .collect();
    assert_eq!(things, vec![Thing::Item(2)]);

    assert!(repo.remove_area_member(area.id, Thing::Item(2)).unwrap());
    assert!(repo.area_entries(area.id).unwrap().is_empty());
    repo.delete_area(area.id).unwrap();
    assert_eq!(repo.area_by_id(area.id).unwrap_err().kind(), ErrorKind::NotFound);
}
