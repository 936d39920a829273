//! Instrumented collaborators and the [`TestContext`] that wires them up.
//!
//! [`RecordingIndex`] and [`FlakyStore`] wrap the in-memory backends. They
//! log every call so tests can assert on the exact traffic, and they accept
//! scripted responses and injected failures.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use search_sync::backends::memory::{MemoryRecordStore, MemorySearchIndex};
use search_sync::config::SyncOptions;
use search_sync::core::{
    Attributes, FieldPatch, Hit, IndexSettings, RecordFilter, RecordStore, SearchIndex,
    SearchResponse,
};
use search_sync::error::{IndexError, IndexResult, StoreError, StoreResult};
use search_sync::record::{Record, RecordKey};
use search_sync::schema::SchemaDeclaration;
use search_sync::sync::IndexSync;

use super::fixtures::{book_options, book_schema};

// ============================================================================
// Recording index
// ============================================================================

/// A call made to the search index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexCall {
    Clear,
    Add(Attributes),
    AddBatch(Vec<Attributes>),
    Save(String, Attributes),
    Delete(String),
    Settings(IndexSettings, bool),
    Search(Map<String, Value>),
}

/// Search index that records calls and can be scripted.
pub struct RecordingIndex {
    inner: MemorySearchIndex,
    calls: Mutex<Vec<IndexCall>>,
    scripted_ids: Mutex<VecDeque<String>>,
    scripted_hits: Mutex<Option<Vec<Hit>>>,
    batch_shortfall: Mutex<usize>,
    failing: Mutex<bool>,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self {
            inner: MemorySearchIndex::new("books"),
            calls: Mutex::new(Vec::new()),
            scripted_ids: Mutex::new(VecDeque::new()),
            scripted_hits: Mutex::new(None),
            batch_shortfall: Mutex::new(0),
            failing: Mutex::new(false),
        }
    }

    /// Next creates return these identifiers, in order.
    pub fn script_ids<I: IntoIterator<Item = &'static str>>(&self, ids: I) {
        self.scripted_ids
            .lock()
            .extend(ids.into_iter().map(str::to_string));
    }

    /// Searches return these hits instead of querying the entries.
    pub fn script_hits(&self, hits: Vec<Value>) {
        let hits = hits
            .into_iter()
            .map(|v| serde_json::from_value(v).expect("hit must be an object"))
            .collect();
        *self.scripted_hits.lock() = Some(hits);
    }

    /// Batch creates return `n` fewer identifiers than submitted.
    pub fn drop_batch_ids(&self, n: usize) {
        *self.batch_shortfall.lock() = n;
    }

    /// Every call fails with a transport error while set.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn get(&self, object_id: &str) -> Option<Attributes> {
        self.inner.get(object_id)
    }

    pub fn object_ids(&self) -> Vec<String> {
        self.inner.object_ids()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    fn record(&self, call: IndexCall) -> IndexResult<()> {
        self.calls.lock().push(call);
        if *self.failing.lock() {
            return Err(IndexError::Transport {
                backend_name: "recording".to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn create(&self, attributes: Attributes) -> IndexResult<String> {
        let scripted = self.scripted_ids.lock().pop_front();
        match scripted {
            Some(id) => {
                self.inner.save_object(&id, attributes).await?;
                Ok(id)
            }
            None => self.inner.add_object(attributes).await,
        }
    }
}

#[async_trait]
impl SearchIndex for RecordingIndex {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn clear_index(&self) -> IndexResult<()> {
        self.record(IndexCall::Clear)?;
        self.inner.clear_index().await
    }

    async fn add_object(&self, attributes: Attributes) -> IndexResult<String> {
        self.record(IndexCall::Add(attributes.clone()))?;
        self.create(attributes).await
    }

    async fn add_objects(&self, objects: Vec<Attributes>) -> IndexResult<Vec<String>> {
        self.record(IndexCall::AddBatch(objects.clone()))?;
        let mut ids = Vec::with_capacity(objects.len());
        for object in objects {
            ids.push(self.create(object).await?);
        }
        let shortfall = *self.batch_shortfall.lock();
        ids.truncate(ids.len().saturating_sub(shortfall));
        Ok(ids)
    }

    async fn save_object(&self, object_id: &str, attributes: Attributes) -> IndexResult<()> {
        self.record(IndexCall::Save(object_id.to_string(), attributes.clone()))?;
        self.inner.save_object(object_id, attributes).await
    }

    async fn delete_object(&self, object_id: &str) -> IndexResult<()> {
        self.record(IndexCall::Delete(object_id.to_string()))?;
        self.inner.delete_object(object_id).await
    }

    async fn set_settings(
        &self,
        settings: IndexSettings,
        forward_to_replicas: bool,
    ) -> IndexResult<()> {
        self.record(IndexCall::Settings(settings.clone(), forward_to_replicas))?;
        self.inner.set_settings(settings, forward_to_replicas).await
    }

    async fn search(&self, params: Map<String, Value>) -> IndexResult<SearchResponse> {
        self.record(IndexCall::Search(params.clone()))?;
        let scripted = self.scripted_hits.lock().clone();
        match scripted {
            Some(hits) => Ok(SearchResponse::new(hits)),
            None => self.inner.search(params).await,
        }
    }
}

// ============================================================================
// Flaky store
// ============================================================================

/// Record store whose writes and reads can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryRecordStore,
    failing_keys: Mutex<HashSet<RecordKey>>,
    failing_find: Mutex<bool>,
    updates: Mutex<Vec<(RecordKey, FieldPatch)>>,
    finds: Mutex<Vec<(RecordFilter, Option<Vec<String>>)>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: Record) {
        self.inner.insert(record);
    }

    pub fn get(&self, key: &str) -> Option<Record> {
        self.inner.get(&RecordKey::new(key))
    }

    /// `update_one` on this key fails.
    pub fn fail_updates_for(&self, key: &str) {
        self.failing_keys.lock().insert(RecordKey::new(key));
    }

    /// Every `find` fails while set.
    pub fn set_failing_find(&self, failing: bool) {
        *self.failing_find.lock() = failing;
    }

    pub fn updates(&self) -> Vec<(RecordKey, FieldPatch)> {
        self.updates.lock().clone()
    }

    pub fn finds(&self) -> Vec<(RecordFilter, Option<Vec<String>>)> {
        self.finds.lock().clone()
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    async fn find(
        &self,
        filter: &RecordFilter,
        projection: Option<&[String]>,
    ) -> StoreResult<Vec<Record>> {
        self.finds
            .lock()
            .push((filter.clone(), projection.map(<[String]>::to_vec)));
        if *self.failing_find.lock() {
            return Err(StoreError::ConnectionFailed {
                backend_name: "flaky".to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.inner.find(filter, projection).await
    }

    async fn save(&self, record: &Record) -> StoreResult<()> {
        self.inner.save(record).await
    }

    async fn update_one(&self, key: &RecordKey, patch: &FieldPatch) -> StoreResult<()> {
        self.updates.lock().push((key.clone(), patch.clone()));
        if self.failing_keys.lock().contains(key) {
            return Err(StoreError::Internal {
                backend_name: "flaky".to_string(),
                message: format!("injected failure for {key}"),
                source: None,
            });
        }
        self.inner.update_one(key, patch).await
    }

    async fn update_many(&self, filter: &RecordFilter, patch: &FieldPatch) -> StoreResult<u64> {
        self.inner.update_many(filter, patch).await
    }
}

// ============================================================================
// Context
// ============================================================================

/// A registered collection plus handles on both collaborators.
pub struct TestContext {
    pub sync: IndexSync,
    pub index: Arc<RecordingIndex>,
    pub store: Arc<FlakyStore>,
}

impl TestContext {
    /// Book collection with default options.
    pub fn new() -> Self {
        Self::with_options(book_options())
    }

    pub fn with_options(options: SyncOptions) -> Self {
        Self::with_schema(book_schema(), options)
    }

    pub fn with_schema(schema: SchemaDeclaration, options: SyncOptions) -> Self {
        let index = Arc::new(RecordingIndex::new());
        let store = Arc::new(FlakyStore::new());
        let sync = IndexSync::register(schema, &options, index.clone(), store.clone())
            .expect("registration must succeed");
        Self { sync, index, store }
    }

    /// Inserts records into the store.
    pub fn seed(&self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.store.insert(record);
        }
    }
}
