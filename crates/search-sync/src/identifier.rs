//! The external identifier field.
//!
//! Every synced record carries the identifier the search service assigned to
//! its index entry. The field name is configuration, not a constant, so all
//! access goes through one [`IdentifierField`] built at registration.

use serde_json::Value;

use crate::error::ConfigError;
use crate::record::Record;

/// Default name of the identifier field.
pub const DEFAULT_IDENTIFIER_FIELD: &str = "_algoliaObjectID";

/// Resolves the identifier field on records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierField {
    name: String,
}

impl IdentifierField {
    /// Creates the field from a configured name.
    ///
    /// The name is HTML-escaped before use. Names that are empty after
    /// trimming are rejected.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidFieldName {
                name: name.to_string(),
            });
        }
        Ok(Self {
            name: escape_html(name),
        })
    }

    /// Returns the sanitized field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the identifier stored on a record, if set.
    ///
    /// Absent fields, `null`, empty strings and non-string values all count as
    /// unset.
    pub fn get<'a>(&self, record: &'a Record) -> Option<&'a str> {
        record.get(&self.name).and_then(identifier_value)
    }

    /// Returns true if the record carries an identifier.
    pub fn is_set(&self, record: &Record) -> bool {
        self.get(record).is_some()
    }

    /// Stamps an identifier on a record.
    pub fn set(&self, record: &mut Record, object_id: &str) {
        record.set(self.name.clone(), Value::String(object_id.to_string()));
    }
}

impl Default for IdentifierField {
    fn default() -> Self {
        Self {
            name: DEFAULT_IDENTIFIER_FIELD.to_string(),
        }
    }
}

/// Interprets a raw field value as an identifier.
pub(crate) fn identifier_value(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// Escapes the five HTML-significant characters.
fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
