use bunny_core::codec::key::record_key;
use bunny_core::codec::EntityKind;
use bunny_core::db::migrations::latest_version;
use bunny_core::db::{open_store, open_store_in_memory, KeyRange, StoreConfig, StoreError, TxMode};
use bunny_core::repo::tx::DataTx;
use bunny_core::{EntityRepository, ErrorKind, Item};
use rusqlite::Connection;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

#[test]
fn view_transactions_reject_writes() {
    let store = open_store_in_memory(&StoreConfig::default()).unwrap();

    let tx = store.view().unwrap();
    assert_eq!(tx.mode(), TxMode::View);
    assert!(!tx.is_writable());
    assert!(matches!(tx.set("k", "v"), Err(StoreError::ReadOnly)));
    assert!(matches!(tx.delete("k"), Err(StoreError::ReadOnly)));
    tx.close().unwrap();

    let data = DataTx::view(&store).unwrap();
    let err = data.items().force_set(&Item::new(1, "a", "")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
}

#[test]
fn update_commits_on_close_and_drop_rolls_back() {
    let store = open_store_in_memory(&StoreConfig::default()).unwrap();

    let tx = store.update().unwrap();
    tx.set("a", "1").unwrap();
    tx.close().unwrap();

    {
        let tx = store.update().unwrap();
        tx.set("a", "2").unwrap();
        tx.set("b", "3").unwrap();
    }

    let tx = store.view().unwrap();
    assert_eq!(tx.get("a").unwrap().as_deref(), Some("1"));
    assert_eq!(tx.get("b").unwrap(), None);
    tx.close().unwrap();
}

#[test]
fn panicking_caller_leaves_no_partial_writes() {
    let store = open_store_in_memory(&StoreConfig::default()).unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let tx = store.update().unwrap();
        tx.set("half", "done").unwrap();
        panic!("caller failed mid-transaction");
    }));
    assert!(outcome.is_err());

    let tx = store.view().unwrap();
    assert_eq!(tx.get("half").unwrap(), None);
    tx.close().unwrap();
}

#[test]
fn only_one_transaction_is_open_at_a_time() {
    let store = open_store_in_memory(&StoreConfig::default()).unwrap();

    let first = store.update().unwrap();
    assert!(store.view().is_err());
    first.close().unwrap();
    store.view().unwrap().close().unwrap();
}

#[test]
fn range_scans_follow_byte_order_and_limits() {
    let store = open_store_in_memory(&StoreConfig::default()).unwrap();
    let tx = store.update().unwrap();
    for key in ["p/2", "p/1", "p/3", "pa", "q/1", "o/9"] {
        tx.set(key, key).unwrap();
    }

    let prefix = KeyRange::prefix("p/");
    let keys = |entries: Vec<(String, String)>| -> Vec<String> {
        entries.into_iter().map(|(key, _)| key).collect()
    };
    assert_eq!(keys(tx.ascend(&prefix, None).unwrap()), ["p/1", "p/2", "p/3"]);
    assert_eq!(keys(tx.descend(&prefix, Some(1)).unwrap()), ["p/3"]);
    assert_eq!(
        keys(tx.ascend(&KeyRange::between("o", "pa"), Some(2)).unwrap()),
        ["o/9", "p/1"]
    );
    assert_eq!(keys(tx.ascend(&KeyRange::prefix(""), None).unwrap()).len(), 6);

    assert!(tx.delete("p/2").unwrap());
    assert!(!tx.delete("p/2").unwrap());
    tx.rollback().unwrap();

    let tx = store.view().unwrap();
    assert!(tx.ascend(&prefix, None).unwrap().is_empty());
    tx.close().unwrap();
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bunny.db");
    let config = StoreConfig {
        busy_timeout: Duration::from_millis(250),
    };

    {
        let store = open_store(&path, &config).unwrap();
        assert_eq!(store.schema_version().unwrap(), latest_version());
        EntityRepository::new(&store).seed_demo_data().unwrap();
    }

    let store = open_store(&path, &config).unwrap();
    assert_eq!(store.schema_version().unwrap(), latest_version());
    let repo = EntityRepository::new(&store);
    assert_eq!(repo.item_by_id(1).unwrap().title, "Hello world!");
    assert_eq!(repo.list_items(1).unwrap().len(), 5);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_store(&path, &StoreConfig::default()) {
        Err(StoreError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema must be rejected"),
    }
}

#[test]
fn separate_stores_on_one_file_read_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let config = StoreConfig::default();
    let writer = open_store(&path, &config).unwrap();
    EntityRepository::new(&writer).seed_demo_data().unwrap();

    let first = open_store(&path, &config).unwrap();
    let second = open_store(&path, &config).unwrap();
    let first_tx = first.view().unwrap();
    let second_tx = second.view().unwrap();
    let key = record_key(EntityKind::User, 1);
    assert!(first_tx.get(&key).unwrap().is_some());
    assert!(second_tx.get(&key).unwrap().is_some());
    first_tx.close().unwrap();
    second_tx.close().unwrap();

    std::thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let store = open_store(&path, &config).unwrap();
                    let repo = EntityRepository::new(&store);
                    repo.list_items(1).unwrap().len()
                })
            })
            .collect();
        for reader in readers {
            assert_eq!(reader.join().unwrap(), 5);
        }
    });
}
