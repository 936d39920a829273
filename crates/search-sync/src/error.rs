//! Error types for the sync layer.
//!
//! Errors are split by the collaborator they originate from: configuration
//! problems detected at registration, failures reported by the search index,
//! and failures reported by the record store. [`SyncError`] composes them and
//! adds the protocol-level failures (unindexed records, orphaned entries).

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::record::RecordKey;

/// The primary error type for all sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Search index errors
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Record store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation needs an index entry but the record has no identifier.
    #[error("record {key} has not been indexed")]
    NotIndexed { key: RecordKey },

    /// The index entry was created but its identifier could not be written
    /// back to the record. The entry is orphaned until the next full sync.
    #[error("index entry {object_id} created but not persisted on record {key}: {source}")]
    IdentifierNotPersisted {
        key: RecordKey,
        object_id: String,
        #[source]
        source: StoreError,
    },

    /// A bulk sync submitted every record but could not persist all identifiers.
    #[error("bulk sync persisted {persisted} identifiers, {} failed", .failed.len())]
    IncompletePersistence {
        persisted: usize,
        failed: Vec<PersistFailure>,
    },
}

/// A record whose identifier could not be persisted during a bulk sync.
#[derive(Debug, Clone)]
pub struct PersistFailure {
    /// The record's primary key.
    pub key: RecordKey,
    /// The identifier assigned by the index.
    pub object_id: String,
    /// The store error message.
    pub message: String,
}

/// Configuration errors, raised before any collaborator is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required option is missing or empty.
    #[error("missing option key: {key}")]
    MissingOption { key: String },

    /// The schema declaration could not be interpreted.
    #[error("malformed schema declaration for field '{field}': {message}")]
    MalformedSchema { field: String, message: String },

    /// The configured identifier field name is unusable.
    #[error("invalid identifier field name: '{name}'")]
    InvalidFieldName { name: String },
}

/// Errors reported by a search index backend.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The request never reached the service or the connection dropped.
    #[error("transport failure talking to {backend_name}: {message}")]
    Transport {
        backend_name: String,
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("{backend_name} rejected the request (status {status}): {message}")]
    Rejected {
        backend_name: String,
        status: u16,
        message: String,
    },

    /// The service answered with a body we could not interpret.
    #[error("unexpected response from {backend_name}: {message}")]
    UnexpectedResponse {
        backend_name: String,
        message: String,
    },

    /// A batch create returned a different number of identifiers than submitted.
    #[error("batch create returned {returned} identifiers for {submitted} objects")]
    BatchMismatch { submitted: usize, returned: usize },
}

/// Errors reported by a record store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection to the store failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Internal store error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// No record exists under the given key.
    #[error("record not found: {key}")]
    NotFound { key: RecordKey },
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type alias for search index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        }
    }
}
