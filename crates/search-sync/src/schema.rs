//! Schema declarations and field projection.
//!
//! A [`SchemaDeclaration`] describes the fields of a collection and which of
//! them are eligible for the search index. The [`Projection`] derived from it
//! is computed once at registration and then applied to every record pushed to
//! the index.
//!
//! # Example
//!
//! ```
//! use search_sync::schema::{FieldSpec, FieldType, Projection, SchemaDeclaration};
//! use search_sync::record::Record;
//! use serde_json::json;
//!
//! let schema = SchemaDeclaration::new()
//!     .field("title", FieldSpec::indexed(FieldType::String))
//!     .field("secret", FieldSpec::new(FieldType::String));
//!
//! let projection = Projection::from_schema(&schema);
//! let record = Record::from_value("1", json!({"title": "x", "secret": "y"})).unwrap();
//!
//! assert_eq!(json!(projection.extract(&record)), json!({"title": "x"}));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::identifier::IdentifierField;
use crate::record::Record;

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Text.
    String,
    /// Integer or floating point number.
    Number,
    /// Boolean flag.
    Boolean,
    /// Date or timestamp.
    Date,
    /// Nested object.
    Object,
    /// List of values.
    Array,
    /// Untyped.
    #[default]
    Any,
}

impl FieldType {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "boolean" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            "object" | "mixed" => Some(FieldType::Object),
            "array" => Some(FieldType::Array),
            "any" => Some(FieldType::Any),
            _ => None,
        }
    }
}

/// Metadata for a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Declared type.
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Whether the field is pushed to the search index.
    #[serde(default, alias = "algoliaIndex")]
    pub indexed: bool,

    /// Whether the field must be present on records.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// A field that is not indexed.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            indexed: false,
            required: false,
        }
    }

    /// A field that is pushed to the search index.
    pub fn indexed(field_type: FieldType) -> Self {
        Self {
            field_type,
            indexed: true,
            required: false,
        }
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// The declared shape of a collection's records.
///
/// Fields keep their declaration order. Declaring a field twice replaces the
/// earlier declaration in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDeclaration {
    fields: Vec<(String, FieldSpec)>,
}

impl SchemaDeclaration {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(name.into(), spec);
        self
    }

    fn insert(&mut self, name: String, spec: FieldSpec) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = spec,
            None => self.fields.push((name, spec)),
        }
    }

    /// Parses a declaration from a JSON object of field name to metadata.
    ///
    /// Metadata objects accept `type`, `indexed` (or the legacy
    /// `algoliaIndex`) and `required`. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        let obj = value.as_object().ok_or_else(|| ConfigError::MalformedSchema {
            field: String::new(),
            message: "schema declaration must be a JSON object".to_string(),
        })?;

        let mut schema = Self::new();
        for (name, meta) in obj {
            if name.trim().is_empty() {
                return Err(malformed(name, "field name must not be empty"));
            }
            let meta = meta
                .as_object()
                .ok_or_else(|| malformed(name, "field metadata must be a JSON object"))?;

            let field_type = match meta.get("type") {
                None | Some(Value::Null) => FieldType::Any,
                Some(Value::String(s)) => FieldType::parse(s)
                    .ok_or_else(|| malformed(name, &format!("unknown field type '{}'", s)))?,
                Some(_) => return Err(malformed(name, "'type' must be a string")),
            };

            let indexed = flag(name, meta, "indexed")?
                .or(flag(name, meta, "algoliaIndex")?)
                .unwrap_or(false);
            let required = flag(name, meta, "required")?.unwrap_or(false);

            schema.insert(
                name.clone(),
                FieldSpec {
                    field_type,
                    indexed,
                    required,
                },
            );
        }
        Ok(schema)
    }

    /// Returns the declaration extended with the identifier field.
    ///
    /// The identifier is a non-indexed, optional string. Declaring it
    /// yourself as an indexed field is an error.
    pub fn with_identifier_field(mut self, identifier: &IdentifierField) -> Result<Self, ConfigError> {
        if let Some(spec) = self.get(identifier.name()) {
            if spec.indexed {
                return Err(malformed(
                    identifier.name(),
                    "the identifier field cannot be indexed",
                ));
            }
        }
        self.insert(
            identifier.name().to_string(),
            FieldSpec::new(FieldType::String),
        );
        Ok(self)
    }

    /// Returns the metadata of a field.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Returns true if the field is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Returns the declared field names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Returns the number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn malformed(field: &str, message: &str) -> ConfigError {
    ConfigError::MalformedSchema {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn flag(field: &str, meta: &Map<String, Value>, key: &str) -> Result<Option<bool>, ConfigError> {
    match meta.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(malformed(field, &format!("'{}' must be a boolean", key))),
    }
}

/// The index-eligible fields of a schema.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Selects every field declared as indexed.
    pub fn from_schema(schema: &SchemaDeclaration) -> Self {
        Self {
            fields: schema
                .fields()
                .filter(|(_, spec)| spec.indexed)
                .map(|(name, _)| name.to_string())
                .collect(),
        }
    }

    /// Returns the projected field names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns true if the field is projected.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Returns true if nothing is projected.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Extracts the projected attributes from a record.
    ///
    /// Fields missing from the record are omitted rather than sent as null.
    pub fn extract(&self, record: &Record) -> Map<String, Value> {
        let mut attributes = Map::new();
        for field in &self.fields {
            if let Some(value) = record.get(field) {
                attributes.insert(field.clone(), value.clone());
            }
        }
        attributes
    }
}

impl PartialEq for Projection {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len() && self.fields.iter().all(|f| other.contains(f))
    }
}

impl Eq for Projection {}
