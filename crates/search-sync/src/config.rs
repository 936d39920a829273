//! Configuration for a synced collection.
//!
//! [`SyncOptions`] carries the search service credentials, the target index,
//! the identifier field name and the policies that govern the protocol's
//! ambiguous corners. Options are validated once, at registration, before
//! any collaborator is touched.
//!
//! # Example
//!
//! ```
//! use search_sync::config::SyncOptions;
//!
//! let options: SyncOptions = serde_json::from_value(serde_json::json!({
//!     "appId": "APP",
//!     "apiKey": "secret",
//!     "indexName": "books"
//! })).unwrap();
//!
//! options.validate().unwrap();
//! assert_eq!(options.identifier_field().unwrap().name(), "_algoliaObjectID");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identifier::{DEFAULT_IDENTIFIER_FIELD, IdentifierField};

/// Environment variable for the service credential id.
pub const ENV_CREDENTIAL_ID: &str = "SEARCH_SYNC_CREDENTIAL_ID";
/// Environment variable for the service secret key.
pub const ENV_SECRET_KEY: &str = "SEARCH_SYNC_SECRET_KEY";
/// Environment variable for the index name.
pub const ENV_INDEX_NAME: &str = "SEARCH_SYNC_INDEX_NAME";
/// Environment variable for the identifier field name.
pub const ENV_IDENTIFIER_FIELD: &str = "SEARCH_SYNC_IDENTIFIER_FIELD";

/// What to do when an update arrives for a record that was never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnindexedUpdatePolicy {
    /// Create the index entry.
    #[default]
    Create,
    /// Drop the update.
    Skip,
}

/// How the identifier returned by a create is written back to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierWrite {
    /// Await the write; a failure fails the operation.
    #[default]
    Await,
    /// Spawn the write on the runtime and return immediately.
    Detached,
}

/// What a populated search does when the record lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulateFailurePolicy {
    /// Fail the whole search.
    #[default]
    Fail,
    /// Return the raw hits.
    Degrade,
}

/// Options for registering a collection with the search index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Search service application / credential id.
    #[serde(default, alias = "appId", alias = "serviceCredentialId")]
    pub service_credential_id: Option<String>,

    /// Search service secret key.
    #[serde(default, alias = "apiKey", alias = "serviceSecretKey")]
    pub service_secret_key: Option<String>,

    /// Name of the target index.
    #[serde(default, alias = "indexName")]
    pub index_name: Option<String>,

    /// Name of the record field holding the external identifier.
    #[serde(
        default,
        alias = "fieldName",
        alias = "identifierFieldName",
        skip_serializing_if = "Option::is_none"
    )]
    pub identifier_field_name: Option<String>,

    /// Policy for updates on never-indexed records.
    #[serde(default)]
    pub unindexed_update: UnindexedUpdatePolicy,

    /// Identifier write-back mode.
    #[serde(default)]
    pub identifier_write: IdentifierWrite,

    /// Policy for failed search enrichment.
    #[serde(default)]
    pub populate_failure: PopulateFailurePolicy,
}

impl SyncOptions {
    /// Creates options with the three required keys set.
    pub fn new(
        service_credential_id: impl Into<String>,
        service_secret_key: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            service_credential_id: Some(service_credential_id.into()),
            service_secret_key: Some(service_secret_key.into()),
            index_name: Some(index_name.into()),
            ..Self::default()
        }
    }

    /// Reads options from `SEARCH_SYNC_*` environment variables.
    ///
    /// Missing variables are left unset; call [`validate`](Self::validate)
    /// to enforce the required keys.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok();
        Self {
            service_credential_id: var(ENV_CREDENTIAL_ID),
            service_secret_key: var(ENV_SECRET_KEY),
            index_name: var(ENV_INDEX_NAME),
            identifier_field_name: var(ENV_IDENTIFIER_FIELD),
            ..Self::default()
        }
    }

    /// Sets the identifier field name.
    pub fn with_identifier_field(mut self, name: impl Into<String>) -> Self {
        self.identifier_field_name = Some(name.into());
        self
    }

    /// Sets the policy for updates on never-indexed records.
    pub fn with_unindexed_update(mut self, policy: UnindexedUpdatePolicy) -> Self {
        self.unindexed_update = policy;
        self
    }

    /// Sets the identifier write-back mode.
    pub fn with_identifier_write(mut self, mode: IdentifierWrite) -> Self {
        self.identifier_write = mode;
        self
    }

    /// Sets the policy for failed search enrichment.
    pub fn with_populate_failure(mut self, policy: PopulateFailurePolicy) -> Self {
        self.populate_failure = policy;
        self
    }

    /// Checks that every required key is present and non-empty.
    ///
    /// The error names the first missing key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("serviceCredentialId", &self.service_credential_id),
            ("serviceSecretKey", &self.service_secret_key),
            ("indexName", &self.index_name),
        ];
        for (key, value) in required {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                return Err(ConfigError::MissingOption {
                    key: key.to_string(),
                });
            }
        }
        self.identifier_field()?;
        Ok(())
    }

    /// Returns the sanitized identifier field.
    pub fn identifier_field(&self) -> Result<IdentifierField, ConfigError> {
        IdentifierField::new(
            self.identifier_field_name
                .as_deref()
                .unwrap_or(DEFAULT_IDENTIFIER_FIELD),
        )
    }

    /// Returns the credential id, or an empty string if unset.
    pub fn credential_id(&self) -> &str {
        self.service_credential_id.as_deref().unwrap_or_default()
    }

    /// Returns the secret key, or an empty string if unset.
    pub fn secret_key(&self) -> &str {
        self.service_secret_key.as_deref().unwrap_or_default()
    }

    /// Returns the index name, or an empty string if unset.
    pub fn index(&self) -> &str {
        self.index_name.as_deref().unwrap_or_default()
    }
}
