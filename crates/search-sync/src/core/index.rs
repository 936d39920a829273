//! The search index collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IndexResult;

/// Name of the attribute that carries an entry's identifier in the index.
pub const OBJECT_ID: &str = "objectID";

/// Attributes of an index entry.
pub type Attributes = Map<String, Value>;

/// Index settings, passed through to the service untouched.
pub type IndexSettings = Map<String, Value>;

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hit(pub Map<String, Value>);

impl Hit {
    /// Returns the hit's `objectID`, if present.
    pub fn object_id(&self) -> Option<&str> {
        self.0.get(OBJECT_ID).and_then(Value::as_str)
    }

    /// Returns the hit's attributes.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the hit, returning its attributes.
    pub fn into_attributes(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Hit {
    fn from(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }
}

/// Response of a search call.
///
/// Anything besides the hit list (hit counts, paging, timing) is kept in
/// `metadata` so callers see it unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Hits in ranking order.
    pub hits: Vec<Hit>,

    /// Remaining response fields.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl SearchResponse {
    /// Creates a response with the given hits and no metadata.
    pub fn new(hits: Vec<Hit>) -> Self {
        Self {
            hits,
            metadata: Map::new(),
        }
    }
}

/// A hosted full-text search index.
///
/// Entries are keyed by an `objectID` that the index assigns on creation.
/// Implementations must return identifiers from [`add_objects`] in the order
/// the objects were submitted.
///
/// [`add_objects`]: SearchIndex::add_objects
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Returns a short name for the backend, used in logs and errors.
    fn backend_name(&self) -> &'static str;

    /// Removes every entry from the index.
    async fn clear_index(&self) -> IndexResult<()>;

    /// Creates an entry and returns its assigned `objectID`.
    async fn add_object(&self, attributes: Attributes) -> IndexResult<String>;

    /// Creates entries in one batch and returns their `objectID`s in
    /// submission order.
    async fn add_objects(&self, objects: Vec<Attributes>) -> IndexResult<Vec<String>>;

    /// Replaces the attributes of an existing entry.
    async fn save_object(&self, object_id: &str, attributes: Attributes) -> IndexResult<()>;

    /// Deletes an entry.
    async fn delete_object(&self, object_id: &str) -> IndexResult<()>;

    /// Applies index settings.
    async fn set_settings(
        &self,
        settings: IndexSettings,
        forward_to_replicas: bool,
    ) -> IndexResult<()>;

    /// Runs a search. `params` always contains a `query` string.
    async fn search(&self, params: Map<String, Value>) -> IndexResult<SearchResponse>;
}
