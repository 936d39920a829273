//! Collaborator traits.
//!
//! The sync protocol sits between two systems it does not own:
//!
//! - [`SearchIndex`] - the hosted full-text index
//! - [`RecordStore`] - the authoritative document store
//!
//! Both are injected into [`IndexSync`](crate::sync::IndexSync) as trait
//! objects, so any backend (or a test double) can be plugged in.
//!
//! # Example: Implementing a Search Index
//!
//! ```ignore
//! use async_trait::async_trait;
//! use search_sync::core::{Attributes, SearchIndex};
//! use search_sync::error::IndexResult;
//!
//! struct MyIndex {
//!     // ... client handle
//! }
//!
//! #[async_trait]
//! impl SearchIndex for MyIndex {
//!     fn backend_name(&self) -> &'static str {
//!         "my-index"
//!     }
//!
//!     async fn add_object(&self, attributes: Attributes) -> IndexResult<String> {
//!         // Implementation...
//!         todo!()
//!     }
//!
//!     // ... implement other required methods
//! }
//! ```

pub mod index;
pub mod store;

pub use index::{Attributes, Hit, IndexSettings, OBJECT_ID, SearchIndex, SearchResponse};
pub use store::{FieldPatch, RecordFilter, RecordStore};
