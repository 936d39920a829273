//! Elasticsearch search index.
//!
//! Implements [`SearchIndex`](crate::core::SearchIndex) on the official
//! client. Each entry is a document whose auto-generated `_id` serves as the
//! `objectID`; search hits expose it under that name alongside `_source`.
//!
//! | Operation | Elasticsearch API |
//! |-----------|-------------------|
//! | `add_object` | index (auto id) |
//! | `add_objects` | bulk, one `index` action per object |
//! | `save_object` | index with id |
//! | `delete_object` | delete (404 tolerated) |
//! | `clear_index` | delete-by-query `match_all` |
//! | `set_settings` | indices put-settings |
//! | `search` | search with `simple_query_string` |

mod index;

pub use index::{ElasticsearchAuth, ElasticsearchConfig, ElasticsearchIndex};
