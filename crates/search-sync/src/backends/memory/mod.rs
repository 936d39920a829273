//! In-memory backends.
//!
//! Both collaborators live entirely in process memory behind `parking_lot`
//! locks. They are always compiled and are what the test suite runs against.
//!
//! # Example
//!
//! ```
//! use search_sync::backends::memory::{MemoryRecordStore, MemorySearchIndex};
//! use search_sync::record::Record;
//! use serde_json::json;
//!
//! let index = MemorySearchIndex::new("books");
//! let store = MemoryRecordStore::new();
//!
//! store.insert(Record::from_value("b1", json!({"title": "Dune"})).unwrap());
//! assert_eq!(store.len(), 1);
//! assert!(index.is_empty());
//! ```

mod index;
mod store;

pub use index::MemorySearchIndex;
pub use store::MemoryRecordStore;
