//! Search Index Sync
//!
//! This crate keeps a document collection mirrored into a hosted full-text
//! search index. Each record that reaches the index is tagged with the
//! identifier the index assigned to it, so later updates and deletes can be
//! routed to the right entry and search hits can be joined back to records.
//!
//! # Features
//!
//! - **Projection**: only fields declared as indexed are pushed to the index
//! - **Lifecycle hooks**: create, update and delete events drive index writes
//! - **Bulk reconciliation**: clear and rebuild the index from the store
//! - **Populated search**: hits merged with the records they point at
//!
//! # Backend Features
//!
//! Enable backends with feature flags in `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! search-sync = { version = "0.1", features = ["elasticsearch"] }
//! ```
//!
//! Available backend features:
//! - `sqlite` (default) - SQLite record store with in-memory and file modes
//! - `elasticsearch` - Elasticsearch search index
//!
//! The in-memory backends are always available.
//!
//! # Architecture
//!
//! - [`schema`] - Schema declarations and the indexed-field projection
//! - [`identifier`] - The record field holding the index identifier
//! - [`config`] - Registration options and behavioral policies
//! - [`core`] - The search index and record store traits
//! - [`sync`] - The sync service and its operations
//! - [`backends`] - Collaborator implementations
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use search_sync::backends::memory::{MemoryRecordStore, MemorySearchIndex};
//! use search_sync::sync::SearchRequest;
//! use search_sync::{IndexSync, Record, SchemaDeclaration, SyncOptions};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = SchemaDeclaration::from_json(&json!({
//!     "title": {"type": "String", "indexed": true},
//!     "author": {"type": "String", "algoliaIndex": true},
//!     "notes": {"type": "String"}
//! }))?;
//!
//! let store = Arc::new(MemoryRecordStore::new());
//! let sync = IndexSync::register(
//!     schema,
//!     &SyncOptions::new("app-id", "api-key", "books"),
//!     Arc::new(MemorySearchIndex::new("books")),
//!     store.clone(),
//! )?;
//!
//! let mut book = Record::from_value(
//!     "b1",
//!     json!({"title": "Dune", "author": "Herbert", "notes": "private"}),
//! )
//! .unwrap();
//! store.insert(book.clone());
//! sync.on_create(&mut book).await?;
//!
//! let response = sync.search(SearchRequest::new("dune").populate()).await?;
//! assert_eq!(response.hits.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod identifier;
pub mod record;
pub mod schema;
pub mod sync;

// Re-export commonly used types
pub use config::{IdentifierWrite, PopulateFailurePolicy, SyncOptions, UnindexedUpdatePolicy};
pub use error::{ConfigError, IndexError, StoreError, SyncError, SyncResult};
pub use identifier::{DEFAULT_IDENTIFIER_FIELD, IdentifierField};
pub use record::{Record, RecordKey};
pub use schema::{FieldSpec, FieldType, Projection, SchemaDeclaration};
pub use sync::IndexSync;

pub use self::core::{RecordStore, SearchIndex};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
