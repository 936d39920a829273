//! In-memory search index.

use std::fmt::Debug;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::{Attributes, Hit, IndexSettings, OBJECT_ID, SearchIndex, SearchResponse};
use crate::error::IndexResult;

const DEFAULT_HITS_PER_PAGE: usize = 20;

/// A search index held in memory.
///
/// Entries keep their insertion order, which is also the ranking order of
/// search results. Matching is a case-insensitive substring test over every
/// string attribute (and strings inside arrays).
pub struct MemorySearchIndex {
    name: String,
    entries: RwLock<Vec<(String, Attributes)>>,
    settings: RwLock<IndexSettings>,
}

impl Debug for MemorySearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySearchIndex")
            .field("name", &self.name)
            .field("entries", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl MemorySearchIndex {
    /// Creates an empty index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(Vec::new()),
            settings: RwLock::new(Map::new()),
        }
    }

    /// Returns the index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attributes stored under an `objectID`.
    pub fn get(&self, object_id: &str) -> Option<Attributes> {
        self.entries
            .read()
            .iter()
            .find(|(id, _)| id == object_id)
            .map(|(_, attributes)| attributes.clone())
    }

    /// Returns every `objectID` in insertion order.
    pub fn object_ids(&self) -> Vec<String> {
        self.entries.read().iter().map(|(id, _)| id.clone()).collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the settings applied so far.
    pub fn settings(&self) -> IndexSettings {
        self.settings.read().clone()
    }

    fn insert(&self, attributes: Attributes) -> String {
        let object_id = Uuid::new_v4().to_string();
        self.entries.write().push((object_id.clone(), attributes));
        object_id
    }
}

fn matches_query(attributes: &Attributes, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    attributes.values().any(|value| value_contains(value, needle))
}

fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|item| value_contains(item, needle)),
        _ => false,
    }
}

fn usize_param(params: &Map<String, Value>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn clear_index(&self) -> IndexResult<()> {
        self.entries.write().clear();
        Ok(())
    }

    async fn add_object(&self, attributes: Attributes) -> IndexResult<String> {
        Ok(self.insert(attributes))
    }

    async fn add_objects(&self, objects: Vec<Attributes>) -> IndexResult<Vec<String>> {
        Ok(objects.into_iter().map(|o| self.insert(o)).collect())
    }

    async fn save_object(&self, object_id: &str, attributes: Attributes) -> IndexResult<()> {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(id, _)| id == object_id) {
            Some((_, existing)) => *existing = attributes,
            None => entries.push((object_id.to_string(), attributes)),
        }
        Ok(())
    }

    async fn delete_object(&self, object_id: &str) -> IndexResult<()> {
        self.entries.write().retain(|(id, _)| id != object_id);
        Ok(())
    }

    async fn set_settings(
        &self,
        settings: IndexSettings,
        _forward_to_replicas: bool,
    ) -> IndexResult<()> {
        self.settings.write().extend(settings);
        Ok(())
    }

    async fn search(&self, params: Map<String, Value>) -> IndexResult<SearchResponse> {
        let query = params
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let hits_per_page = usize_param(&params, "hitsPerPage", DEFAULT_HITS_PER_PAGE).max(1);
        let page = usize_param(&params, "page", 0);

        let matched: Vec<Hit> = self
            .entries
            .read()
            .iter()
            .filter(|(_, attributes)| matches_query(attributes, &query))
            .map(|(id, attributes)| {
                let mut hit = attributes.clone();
                hit.insert(OBJECT_ID.to_string(), Value::String(id.clone()));
                Hit(hit)
            })
            .collect();

        let nb_hits = matched.len();
        let hits: Vec<Hit> = matched
            .into_iter()
            .skip(page.saturating_mul(hits_per_page))
            .take(hits_per_page)
            .collect();

        let mut response = SearchResponse::new(hits);
        response.metadata.insert("nbHits".to_string(), nb_hits.into());
        response.metadata.insert("page".to_string(), page.into());
        response
            .metadata
            .insert("nbPages".to_string(), nb_hits.div_ceil(hits_per_page).into());
        response
            .metadata
            .insert("hitsPerPage".to_string(), hits_per_page.into());
        response
            .metadata
            .insert("query".to_string(), Value::String(query));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_add_objects_preserves_order() {
        let index = MemorySearchIndex::new("idx");
        let ids = index
            .add_objects(vec![attrs(json!({"n": 1})), attrs(json!({"n": 2}))])
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(index.object_ids(), ids);
        assert_eq!(index.get(&ids[1]), Some(attrs(json!({"n": 2}))));
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let index = MemorySearchIndex::new("idx");
        let id = index.add_object(attrs(json!({"title": "a"}))).await.unwrap();

        index.save_object(&id, attrs(json!({"title": "b"}))).await.unwrap();
        assert_eq!(index.get(&id), Some(attrs(json!({"title": "b"}))));

        index.delete_object(&id).await.unwrap();
        assert!(index.is_empty());

        // Deleting an unknown entry is not an error.
        index.delete_object("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_search_matches_case_insensitively() {
        let index = MemorySearchIndex::new("idx");
        index.add_object(attrs(json!({"title": "Dune"}))).await.unwrap();
        index.add_object(attrs(json!({"title": "Emma", "tags": ["SciFi"]}))).await.unwrap();
        index.add_object(attrs(json!({"year": 1965}))).await.unwrap();

        let response = index
            .search(attrs(json!({"query": "dun"})))
            .await
            .unwrap();
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].attributes().get("title"), Some(&json!("Dune")));
        assert!(response.hits[0].object_id().is_some());

        let response = index.search(attrs(json!({"query": "scifi"}))).await.unwrap();
        assert_eq!(response.hits.len(), 1);

        let response = index.search(attrs(json!({"query": ""}))).await.unwrap();
        assert_eq!(response.hits.len(), 3);
        assert_eq!(response.metadata.get("nbHits"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_search_paging() {
        let index = MemorySearchIndex::new("idx");
        for n in 0..5 {
            index
                .add_object(attrs(json!({"title": format!("book {n}")})))
                .await
                .unwrap();
        }

        let response = index
            .search(attrs(json!({"query": "book", "hitsPerPage": 2, "page": 2})))
            .await
            .unwrap();
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.metadata.get("nbPages"), Some(&json!(3)));
        assert_eq!(response.hits[0].attributes().get("title"), Some(&json!("book 4")));
    }

    #[tokio::test]
    async fn test_clear_and_settings() {
        let index = MemorySearchIndex::new("idx");
        index.add_object(attrs(json!({"a": "b"}))).await.unwrap();
        index.clear_index().await.unwrap();
        assert!(index.is_empty());

        index
            .set_settings(attrs(json!({"searchableAttributes": ["title"]})), true)
            .await
            .unwrap();
        assert_eq!(
            index.settings().get("searchableAttributes"),
            Some(&json!(["title"]))
        );
    }
}
