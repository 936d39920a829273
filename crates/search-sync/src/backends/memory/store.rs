//! In-memory record store.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::{FieldPatch, RecordFilter, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::record::{Record, RecordKey};

/// A record store held in memory, ordered by primary key.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<RecordKey, Record>>,
}

impl Debug for MemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRecordStore")
            .field("records", &self.records.read().len())
            .finish()
    }
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record without going through the trait.
    pub fn insert(&self, record: Record) {
        self.records.write().insert(record.key().clone(), record);
    }

    /// Returns a copy of the record stored under a key.
    pub fn get(&self, key: &RecordKey) -> Option<Record> {
        self.records.read().get(key).cloned()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn project(record: &Record, fields: Option<&[String]>) -> Record {
    let Some(fields) = fields else {
        return record.clone();
    };
    let projected = record
        .fields()
        .iter()
        .filter(|(name, _)| fields.iter().any(|f| f == *name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    Record::new(record.key().clone(), projected)
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find(
        &self,
        filter: &RecordFilter,
        projection: Option<&[String]>,
    ) -> StoreResult<Vec<Record>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| filter.matches(record))
            .map(|record| project(record, projection))
            .collect())
    }

    async fn save(&self, record: &Record) -> StoreResult<()> {
        self.insert(record.clone());
        Ok(())
    }

    async fn update_one(&self, key: &RecordKey, patch: &FieldPatch) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
        patch.apply(record);
        Ok(())
    }

    async fn update_many(&self, filter: &RecordFilter, patch: &FieldPatch) -> StoreResult<u64> {
        let mut updated = 0;
        for record in self.records.write().values_mut() {
            if filter.matches(record) {
                patch.apply(record);
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(key: &str, value: serde_json::Value) -> Record {
        Record::from_value(key, value).unwrap()
    }

    #[tokio::test]
    async fn test_find_orders_by_key_and_projects() {
        let store = MemoryRecordStore::new();
        store.insert(record("b", json!({"title": "B", "secret": 1})));
        store.insert(record("a", json!({"title": "A", "secret": 2})));

        let fields = vec!["title".to_string()];
        let found = store.find(&RecordFilter::All, Some(&fields)).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].key().as_str(), "a");
        assert_eq!(found[0].to_json(), json!({"title": "A"}));
    }

    #[tokio::test]
    async fn test_update_one_missing_record() {
        let store = MemoryRecordStore::new();
        let err = store
            .update_one(&RecordKey::new("nope"), &FieldPatch::new().clear("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_many_counts_matches() {
        let store = MemoryRecordStore::new();
        store.insert(record("a", json!({"id": "o1"})));
        store.insert(record("b", json!({"id": "o2"})));
        store.insert(record("c", json!({})));

        let updated = store
            .update_many(&RecordFilter::Set("id".to_string()), &FieldPatch::new().clear("id"))
            .await
            .unwrap();

        assert_eq!(updated, 2);
        let unset = store
            .find(&RecordFilter::Unset("id".to_string()), None)
            .await
            .unwrap();
        assert_eq!(unset.len(), 3);
    }

    #[tokio::test]
    async fn test_save_replaces() {
        let store = MemoryRecordStore::new();
        store.save(&record("a", json!({"v": 1}))).await.unwrap();
        store.save(&record("a", json!({"v": 2}))).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&RecordKey::new("a")).unwrap().to_json(), json!({"v": 2}));
    }
}
