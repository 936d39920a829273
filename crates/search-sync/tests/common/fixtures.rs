//! Test fixtures: a small book collection.

use serde_json::{Value, json};

use search_sync::config::SyncOptions;
use search_sync::record::Record;
use search_sync::schema::{FieldSpec, FieldType, SchemaDeclaration};

/// Identifier field used when options don't override it.
pub const ID_FIELD: &str = "_algoliaObjectID";

/// Schema with two indexed fields and one private field.
pub fn book_schema() -> SchemaDeclaration {
    SchemaDeclaration::new()
        .field("title", FieldSpec::indexed(FieldType::String).required())
        .field("author", FieldSpec::indexed(FieldType::String))
        .field("notes", FieldSpec::new(FieldType::String))
}

/// Valid options for the `books` index.
pub fn book_options() -> SyncOptions {
    SyncOptions::new("app-id", "api-key", "books")
}

/// A book that has never been indexed.
pub fn book(key: &str, title: &str) -> Record {
    record(
        key,
        json!({"title": title, "author": "anon", "notes": format!("private {key}")}),
    )
}

/// A book already carrying an identifier.
pub fn indexed_book(key: &str, title: &str, object_id: &str) -> Record {
    let mut record = book(key, title);
    record.set(ID_FIELD, Value::String(object_id.to_string()));
    record
}

/// Builds a record from a JSON object literal.
pub fn record(key: &str, value: Value) -> Record {
    Record::from_value(key, value).expect("fixture must be a JSON object")
}
