//! Search with optional record enrichment.
//!
//! With `populate`, each hit is merged with the stored record it points at.
//! Hit attributes win over record fields, and the identifier field is never
//! exposed in the result.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::PopulateFailurePolicy;
use crate::core::{Hit, RecordFilter, SearchResponse};
use crate::error::SyncResult;
use crate::record::Record;

use super::IndexSync;

/// A search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Full-text query string.
    pub query: String,

    /// Extra parameters forwarded to the index.
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Merge each hit with its stored record.
    #[serde(default)]
    pub populate: bool,
}

impl SearchRequest {
    /// Creates a request for a query with no parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Adds a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Replaces all parameters.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Enables record enrichment.
    pub fn populate(mut self) -> Self {
        self.populate = true;
        self
    }

    fn into_index_params(self) -> Map<String, Value> {
        let mut params = self.params;
        params.insert("query".to_string(), Value::String(self.query));
        params
    }
}

impl IndexSync {
    /// Runs a search against the index.
    ///
    /// Without `populate` the index response is returned as is. With it,
    /// matching records are fetched in one store call and merged into the
    /// hits; see [`PopulateFailurePolicy`] for what happens when that fetch
    /// fails.
    pub async fn search(&self, request: SearchRequest) -> SyncResult<SearchResponse> {
        let populate = request.populate;
        let mut response = self.index.search(request.into_index_params()).await?;

        debug!(
            index = %self.options.index(),
            hits = response.hits.len(),
            populate,
            "Search completed"
        );

        if !populate || response.hits.is_empty() {
            return Ok(response);
        }

        let object_ids = unique_object_ids(&response.hits);
        let filter = RecordFilter::In {
            field: self.identifier.name().to_string(),
            values: object_ids,
        };
        let projection = self.schema.field_names();

        let records = match self.store.find(&filter, Some(&projection)).await {
            Ok(records) => records,
            Err(e) => match self.options.populate_failure {
                PopulateFailurePolicy::Fail => return Err(e.into()),
                PopulateFailurePolicy::Degrade => {
                    warn!(
                        index = %self.options.index(),
                        error = %e,
                        "Record lookup failed, returning unpopulated hits"
                    );
                    return Ok(response);
                }
            },
        };

        // First record wins when several share an identifier.
        let mut by_object_id: HashMap<String, Record> = HashMap::with_capacity(records.len());
        for record in records {
            if let Some(object_id) = self.identifier.get(&record).map(str::to_string) {
                by_object_id.entry(object_id).or_insert(record);
            }
        }

        response.hits = response
            .hits
            .into_iter()
            .map(|hit| self.populate_hit(hit, &by_object_id))
            .collect();

        Ok(response)
    }

    fn populate_hit(&self, hit: Hit, records: &HashMap<String, Record>) -> Hit {
        let Some(object_id) = hit.object_id() else {
            return hit;
        };

        let mut merged = records
            .get(object_id)
            .map(|record| record.fields().clone())
            .unwrap_or_default();
        for (key, value) in hit.into_attributes() {
            merged.insert(key, value);
        }
        merged.remove(self.identifier.name());
        Hit(merged)
    }
}

fn unique_object_ids(hits: &[Hit]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(hits.len());
    for id in hits.iter().filter_map(Hit::object_id) {
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}
