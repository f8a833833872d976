//! Contract Test: Object Record Store
//!
//! Runs the same checks against every ObjectStore implementation.
//!
//! Constraints verified:
//! - `get` matches an exact id first, then an id prefix
//! - `get` reports NotFound when nothing matches
//! - Writes replace the whole record, last writer wins

use irr_core::error::Error;
use irr_core::submission::{Action, ObjectType};
use irr_core::traits::{ObjectRecord, ObjectStatus, ObjectStore};
use irr_core::{FileObjectStore, MemoryObjectStore};
use tempfile::tempdir;

fn record(object_type: ObjectType, identifier: &str) -> ObjectRecord {
    ObjectRecord::pending(
        object_type,
        identifier,
        Action::Add,
        format!("{}: {}", object_type, identifier),
    )
}

async fn check_store(store: &dyn ObjectStore) {
    store.put(&record(ObjectType::Route, "10.0.0.0/8")).await.unwrap();
    store.put(&record(ObjectType::Route, "10.0.0.0/16")).await.unwrap();
    store.put(&record(ObjectType::AutNum, "AS65000")).await.unwrap();

    let exact = store.get("route_10_0_0_0_8").await.unwrap();
    assert_eq!(exact.identifier, "10.0.0.0/8");

    let prefixed = store.get("aut-num_AS65").await.unwrap();
    assert_eq!(prefixed.identifier, "AS65000");

    assert!(matches!(store.get("mntner_").await, Err(Error::NotFound(_))));
    assert!(matches!(store.get("").await, Err(Error::NotFound(_))));

    let mut updated = record(ObjectType::AutNum, "AS65000");
    updated.transition(ObjectStatus::Failed);
    updated.message = Some("rejected".into());
    store.put(&updated).await.unwrap();

    let loaded = store.get("aut-num_AS65000").await.unwrap();
    assert_eq!(loaded.status, ObjectStatus::Failed);
    assert_eq!(loaded.message.as_deref(), Some("rejected"));
    assert_eq!(store.list().await.unwrap().len(), 3);
}

#[tokio::test]
async fn memory_store_honours_contract() {
    check_store(&MemoryObjectStore::new()).await;
}

#[tokio::test]
async fn file_store_honours_contract() {
    let dir = tempdir().unwrap();
    let store = FileObjectStore::new(dir.path()).await.unwrap();
    check_store(&store).await;
}

#[tokio::test]
async fn concurrent_writes_to_one_id_leave_one_readable_record() {
    let dir = tempdir().unwrap();
    let store = std::sync::Arc::new(FileObjectStore::new(dir.path()).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut r = record(ObjectType::Route, "192.0.2.0/24");
            r.message = Some(format!("writer {}", i));
            store.put(&r).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let records = store.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].message.as_deref().unwrap().starts_with("writer "));
}
