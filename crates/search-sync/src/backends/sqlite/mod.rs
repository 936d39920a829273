//! SQLite record store.
//!
//! Records are stored as JSON documents, one row per record, in a table
//! shared by every collection. Filters are pushed down as `json_extract`
//! predicates; partial updates are applied to the decoded document and
//! written back inside a transaction.
//!
//! # Example
//!
//! ```no_run
//! use search_sync::backends::sqlite::SqliteRecordStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // In-memory database, good for tests
//! let store = SqliteRecordStore::in_memory("books")?;
//!
//! // File-based database
//! let store = SqliteRecordStore::open("./data/records.db", "books")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE records (
//!     collection TEXT NOT NULL,
//!     id TEXT NOT NULL,
//!     data TEXT NOT NULL,
//!     PRIMARY KEY (collection, id)
//! );
//! ```

mod schema;
mod store;

pub use store::{SqliteRecordStore, SqliteStoreConfig};
