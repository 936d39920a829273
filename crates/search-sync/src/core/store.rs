//! The record store collaborator.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreResult;
use crate::identifier::identifier_value;
use crate::record::{Record, RecordKey};

/// Selects records by the state of one field.
///
/// "Set" follows the identifier convention: a field is set when it holds a
/// non-empty string. Everything else (absent, `null`, `""`, other JSON
/// types) is unset.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    /// Every record.
    All,
    /// Records where the field is unset.
    Unset(String),
    /// Records where the field is set.
    Set(String),
    /// Records where the field equals one of the values.
    In {
        /// The field to match.
        field: String,
        /// Accepted values.
        values: Vec<String>,
    },
}

impl RecordFilter {
    /// Evaluates the filter against a record.
    ///
    /// Backends that cannot push the filter down can use this directly.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Unset(field) => !field_is_set(record, field),
            RecordFilter::Set(field) => field_is_set(record, field),
            RecordFilter::In { field, values } => record
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
        }
    }
}

fn field_is_set(record: &Record, field: &str) -> bool {
    record.get(field).and_then(identifier_value).is_some()
}

/// A partial update: each entry overwrites one field. `null` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    set: Map<String, Value>,
}

impl FieldPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field.
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    /// Clears a field by setting it to `null`.
    pub fn clear(self, field: impl Into<String>) -> Self {
        self.set(field, Value::Null)
    }

    /// Returns the fields this patch writes.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.set
    }

    /// Applies the patch to a record in memory.
    pub fn apply(&self, record: &mut Record) {
        for (field, value) in &self.set {
            record.set(field.clone(), value.clone());
        }
    }
}

/// The authoritative document store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns a short name for the backend, used in logs and errors.
    fn backend_name(&self) -> &'static str;

    /// Finds records matching a filter.
    ///
    /// With a projection, returned records carry only the listed fields.
    async fn find(
        &self,
        filter: &RecordFilter,
        projection: Option<&[String]>,
    ) -> StoreResult<Vec<Record>>;

    /// Inserts or replaces a whole record.
    async fn save(&self, record: &Record) -> StoreResult<()>;

    /// Applies a partial update to one record.
    ///
    /// Fails with [`StoreError::NotFound`](crate::error::StoreError::NotFound)
    /// if no record has the key.
    async fn update_one(&self, key: &RecordKey, patch: &FieldPatch) -> StoreResult<()>;

    /// Applies a partial update to every matching record and returns how many
    /// were updated.
    async fn update_many(&self, filter: &RecordFilter, patch: &FieldPatch) -> StoreResult<u64>;
}
