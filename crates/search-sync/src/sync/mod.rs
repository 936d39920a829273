//! The sync service.
//!
//! [`IndexSync`] binds one collection to one search index. It is built once,
//! at registration, from a schema declaration, validated [`SyncOptions`] and
//! the two collaborators. The projection and identifier field are computed
//! there and never change afterwards.
//!
//! # Operations
//!
//! | Level | Operation | Module |
//! |-------|-----------|--------|
//! | Instance | `add_object`, `update_object`, `delete_object` | [`mutator`] |
//! | Lifecycle | `on_create`, `on_update`, `on_delete`, `dispatch` | [`hooks`] |
//! | Collection | `clear_index`, `sync_all` | [`reconciler`] |
//! | Collection | `search` | [`query`] |
//! | Collection | `set_index_settings` | this module |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use search_sync::backends::memory::{MemoryRecordStore, MemorySearchIndex};
//! use search_sync::config::SyncOptions;
//! use search_sync::record::Record;
//! use search_sync::schema::{FieldSpec, FieldType, SchemaDeclaration};
//! use search_sync::sync::IndexSync;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = SchemaDeclaration::new()
//!     .field("title", FieldSpec::indexed(FieldType::String))
//!     .field("notes", FieldSpec::new(FieldType::String));
//!
//! let store = Arc::new(MemoryRecordStore::new());
//! let sync = IndexSync::register(
//!     schema,
//!     &SyncOptions::new("app", "key", "books"),
//!     Arc::new(MemorySearchIndex::new("books")),
//!     store.clone(),
//! )?;
//!
//! let mut book = Record::from_value("b1", json!({"title": "Dune"})).unwrap();
//! store.insert(book.clone());
//! sync.on_create(&mut book).await?;
//!
//! assert!(sync.identifier().is_set(&book));
//! # Ok(())
//! # }
//! ```

pub mod hooks;
pub mod mutator;
pub mod query;
pub mod reconciler;

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::SyncOptions;
use crate::core::{FieldPatch, IndexSettings, RecordStore, SearchIndex};
use crate::error::{ConfigError, StoreError, SyncResult};
use crate::identifier::IdentifierField;
use crate::record::RecordKey;
use crate::schema::{Projection, SchemaDeclaration};

pub use hooks::{HookOutcome, LifecycleEvent};
pub use query::SearchRequest;
pub use reconciler::{SyncReport, SyncRequest};

/// A collection registered with a search index.
///
/// Cheap to clone; clones share the collaborators.
#[derive(Clone)]
pub struct IndexSync {
    index: Arc<dyn SearchIndex>,
    store: Arc<dyn RecordStore>,
    schema: Arc<SchemaDeclaration>,
    projection: Arc<Projection>,
    identifier: IdentifierField,
    options: SyncOptions,
}

impl Debug for IndexSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSync")
            .field("index", &self.index.backend_name())
            .field("store", &self.store.backend_name())
            .field("index_name", &self.options.index())
            .field("identifier", &self.identifier.name())
            .field("projection", &self.projection.fields())
            .finish_non_exhaustive()
    }
}

impl IndexSync {
    /// Registers a collection.
    ///
    /// Options are validated before anything else; a missing required key
    /// fails here without touching either collaborator. The schema is
    /// extended with the identifier field.
    pub fn register(
        schema: SchemaDeclaration,
        options: &SyncOptions,
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let identifier = options.identifier_field()?;
        let schema = schema.with_identifier_field(&identifier)?;
        let projection = Projection::from_schema(&schema);

        info!(
            index = %options.index(),
            index_backend = index.backend_name(),
            store_backend = store.backend_name(),
            identifier_field = %identifier.name(),
            projected_fields = projection.fields().len(),
            "Registered collection with search index"
        );

        Ok(Self {
            index,
            store,
            schema: Arc::new(schema),
            projection: Arc::new(projection),
            identifier,
            options: options.clone(),
        })
    }

    /// Returns the schema, including the identifier field.
    pub fn schema(&self) -> &SchemaDeclaration {
        &self.schema
    }

    /// Returns the projection pushed to the index.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Returns the identifier field.
    pub fn identifier(&self) -> &IdentifierField {
        &self.identifier
    }

    /// Returns the options the collection was registered with.
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Returns the search index.
    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    /// Returns the record store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Applies settings to the search index.
    pub async fn set_index_settings(
        &self,
        settings: IndexSettings,
        forward_to_replicas: bool,
    ) -> SyncResult<()> {
        debug!(
            index = %self.options.index(),
            keys = settings.len(),
            forward_to_replicas,
            "Applying index settings"
        );
        self.index.set_settings(settings, forward_to_replicas).await?;
        Ok(())
    }

    /// Builds the patch that writes an identifier onto a record.
    pub(crate) fn identifier_patch(&self, object_id: &str) -> FieldPatch {
        FieldPatch::new().set(
            self.identifier.name(),
            Value::String(object_id.to_string()),
        )
    }
}

/// Logs an index entry whose identifier never reached its record.
///
/// Kept on its own target so operators can alert on it and reconcile.
pub(crate) fn log_orphan(key: &RecordKey, object_id: &str, err: &StoreError) {
    error!(
        target: "search_sync::orphan",
        primary_key = %key,
        object_id = %object_id,
        error = %err,
        "index entry orphaned: identifier not persisted on record"
    );
}
