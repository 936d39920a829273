//! Record types.
//!
//! A [`Record`] is one document of a collection as the sync layer sees it: a
//! stable primary key plus a JSON object of fields. The external identifier
//! lives among the fields under a configurable name, see
//! [`IdentifierField`](crate::identifier::IdentifierField).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary key of a record in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// Creates a new record key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for RecordKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A document held by the record store.
///
/// # Examples
///
/// ```
/// use search_sync::record::Record;
/// use serde_json::json;
///
/// let record = Record::from_value("book-1", json!({"title": "Dune", "pages": 412})).unwrap();
///
/// assert_eq!(record.key().as_str(), "book-1");
/// assert_eq!(record.get("title"), Some(&json!("Dune")));
/// assert!(record.get("isbn").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    key: RecordKey,
    fields: Map<String, Value>,
}

impl Record {
    /// Creates a record from a key and a field map.
    pub fn new(key: impl Into<RecordKey>, fields: Map<String, Value>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }

    /// Creates a record from a JSON value, which must be an object.
    ///
    /// Returns `None` for any other JSON type.
    pub fn from_value(key: impl Into<RecordKey>, value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(key, fields)),
            _ => None,
        }
    }

    /// Returns the primary key.
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// Returns the field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a mutable reference to the field map.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Returns the value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    /// Returns the serialized form of the record's fields.
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Consumes the record, returning its field map.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
