//! Collaborator implementations.
//!
//! Search indexes implement [`SearchIndex`](crate::core::SearchIndex) and
//! record stores implement [`RecordStore`](crate::core::RecordStore). All but
//! the in-memory backend are gated behind a feature flag.
//!
//! # Available Backends
//!
//! | Backend | Feature | Implements | Description |
//! |---------|---------|------------|-------------|
//! | Memory | (always) | both | Process-local, for development and tests |
//! | SQLite | `sqlite` | `RecordStore` | JSON documents in an embedded database |
//! | Elasticsearch | `elasticsearch` | `SearchIndex` | Hosted full-text index |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! use search_sync::backends::sqlite::SqliteRecordStore;
//!
//! # #[cfg(feature = "sqlite")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // In-memory store for the "books" collection
//! let store = SqliteRecordStore::in_memory("books")?;
//!
//! // Or a file-based database
//! let store = SqliteRecordStore::open("./data/records.db", "books")?;
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
