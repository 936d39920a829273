//! SQLite record store integration tests.
//!
//! Runs the sync protocol end to end against a file-backed store.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use serde_json::json;

use search_sync::backends::memory::MemorySearchIndex;
use search_sync::backends::sqlite::{SqliteRecordStore, SqliteStoreConfig};
use search_sync::config::SyncOptions;
use search_sync::core::{FieldPatch, RecordFilter, RecordStore};
use search_sync::record::{Record, RecordKey};
use search_sync::schema::{FieldSpec, FieldType, SchemaDeclaration};
use search_sync::sync::{IndexSync, SearchRequest, SyncRequest};

fn schema() -> SchemaDeclaration {
    SchemaDeclaration::new()
        .field("title", FieldSpec::indexed(FieldType::String))
        .field("notes", FieldSpec::new(FieldType::String))
}

fn book(key: &str, title: &str) -> Record {
    Record::from_value(key, json!({"title": title, "notes": format!("about {title}")}))
        .expect("object literal")
}

fn create_sync(store: Arc<SqliteRecordStore>) -> (IndexSync, Arc<MemorySearchIndex>) {
    let index = Arc::new(MemorySearchIndex::new("books"));
    let sync = IndexSync::register(
        schema(),
        &SyncOptions::new("app", "key", "books"),
        index.clone(),
        store,
    )
    .expect("registration");
    (sync, index)
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_create_persists_identifier() {
    let store = Arc::new(SqliteRecordStore::in_memory("books").expect("store"));
    let (sync, index) = create_sync(store.clone());

    let mut record = book("b1", "Dune");
    store.save(&record).await.unwrap();
    sync.on_create(&mut record).await.unwrap();

    let stored = store
        .find(&RecordFilter::Set("_algoliaObjectID".to_string()), None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(sync.identifier().get(&stored[0]), sync.identifier().get(&record));
    assert_eq!(index.len(), 1);
}

// ============================================================================
// Bulk sync
// ============================================================================

#[tokio::test]
async fn test_force_sync_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteStoreConfig {
        max_connections: 4,
        ..Default::default()
    };
    let store = Arc::new(
        SqliteRecordStore::with_config(dir.path().join("books.db"), "books", config).unwrap(),
    );
    let (sync, index) = create_sync(store.clone());

    for (key, title) in [("a", "Dune"), ("b", "Emma"), ("c", "Ulysses")] {
        store.save(&book(key, title)).await.unwrap();
    }
    let mut stale = book("d", "Walden");
    stale.set("_algoliaObjectID", json!("stale"));
    store.save(&stale).await.unwrap();

    let report = sync.sync_all(SyncRequest::force()).await.unwrap();

    assert_eq!(report.cleared, Some(1));
    assert_eq!(report.submitted, 4);
    assert_eq!(report.persisted, 4);
    assert_eq!(index.len(), 4);

    let unset = store
        .find(&RecordFilter::Unset("_algoliaObjectID".to_string()), None)
        .await
        .unwrap();
    assert!(unset.is_empty());

    // Each record points at an entry holding its own title.
    for record in store.find(&RecordFilter::All, None).await.unwrap() {
        let object_id = sync.identifier().get(&record).unwrap();
        assert_eq!(index.get(object_id).unwrap().get("title"), record.get("title"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_write_back_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteRecordStore::open(dir.path().join("books.db"), "books").unwrap());
    let (sync, index) = create_sync(store.clone());

    for i in 0..400 {
        store
            .save(&book(&format!("k{i:03}"), &format!("Title {i}")))
            .await
            .unwrap();
    }

    let report = sync.sync_all(SyncRequest::default()).await.unwrap();

    assert_eq!(report.submitted, 400);
    assert_eq!(report.persisted, 400);
    assert!(report.is_complete());
    assert_eq!(index.len(), 400);

    let unset = store
        .find(&RecordFilter::Unset("_algoliaObjectID".to_string()), None)
        .await
        .unwrap();
    assert!(unset.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_do_not_lose_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteRecordStore::open(dir.path().join("books.db"), "books").unwrap());
    for i in 0..50 {
        store.save(&book(&format!("k{i:02}"), "Untitled")).await.unwrap();
    }

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..50 {
        let store = store.clone();
        tasks.spawn(async move {
            let patch = FieldPatch::new().set("title", json!(format!("Title {i}")));
            store.update_one(&RecordKey::new(format!("k{i:02}")), &patch).await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    for record in store.find(&RecordFilter::All, None).await.unwrap() {
        assert_ne!(record.get("title"), Some(&json!("Untitled")));
    }
}

#[tokio::test]
async fn test_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.db");

    {
        let store = Arc::new(SqliteRecordStore::open(&path, "books").unwrap());
        let (sync, _index) = create_sync(store.clone());
        store.save(&book("a", "Dune")).await.unwrap();
        sync.sync_all(SyncRequest::default()).await.unwrap();
    }

    let store = SqliteRecordStore::open(&path, "books").unwrap();
    let indexed = store
        .find(&RecordFilter::Set("_algoliaObjectID".to_string()), None)
        .await
        .unwrap();
    assert_eq!(indexed.len(), 1);
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_populated_search_reads_from_sqlite() {
    let store = Arc::new(SqliteRecordStore::in_memory("books").unwrap());
    let (sync, _index) = create_sync(store.clone());

    store.save(&book("a", "Dune")).await.unwrap();
    store.save(&book("b", "Emma")).await.unwrap();
    sync.sync_all(SyncRequest::default()).await.unwrap();

    let response = sync
        .search(SearchRequest::new("emma").populate())
        .await
        .unwrap();

    assert_eq!(response.hits.len(), 1);
    let hit = response.hits[0].attributes();
    assert_eq!(hit.get("notes"), Some(&json!("about Emma")));
    assert!(hit.get("_algoliaObjectID").is_none());
}
