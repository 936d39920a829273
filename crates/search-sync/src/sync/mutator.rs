//! Instance-level index operations.
//!
//! These push a single record to the index regardless of its lifecycle
//! state. The lifecycle rules (create vs. update) live in
//! [`hooks`](super::hooks).

use std::sync::Arc;

use tracing::debug;

use crate::config::IdentifierWrite;
use crate::error::{SyncError, SyncResult};
use crate::record::{Record, RecordKey};

use super::{IndexSync, log_orphan};

impl IndexSync {
    /// Creates an index entry for the record.
    ///
    /// The returned `objectID` is stamped on the in-memory record and written
    /// back to the store through a partial update keyed by the record's
    /// primary key. With [`IdentifierWrite::Detached`] the write is spawned
    /// and not awaited.
    pub async fn add_object(&self, record: &mut Record) -> SyncResult<String> {
        let attributes = self.projection.extract(record);
        let object_id = self.index.add_object(attributes).await?;

        debug!(
            primary_key = %record.key(),
            object_id = %object_id,
            "Created index entry"
        );

        self.identifier.set(record, &object_id);
        self.persist_identifier(record.key().clone(), object_id.clone())
            .await?;

        Ok(object_id)
    }

    /// Replaces the record's index entry with its current attributes.
    ///
    /// Fails with [`SyncError::NotIndexed`] if the record has no identifier.
    pub async fn update_object(&self, record: &Record) -> SyncResult<String> {
        let object_id = self.require_identifier(record)?;
        let attributes = self.projection.extract(record);
        self.index.save_object(&object_id, attributes).await?;

        debug!(
            primary_key = %record.key(),
            object_id = %object_id,
            "Updated index entry"
        );
        Ok(object_id)
    }

    /// Deletes the record's index entry.
    ///
    /// The identifier field on the record is left as it is. Fails with
    /// [`SyncError::NotIndexed`] if the record has no identifier.
    pub async fn delete_object(&self, record: &Record) -> SyncResult<String> {
        let object_id = self.require_identifier(record)?;
        self.index.delete_object(&object_id).await?;

        debug!(
            primary_key = %record.key(),
            object_id = %object_id,
            "Deleted index entry"
        );
        Ok(object_id)
    }

    fn require_identifier(&self, record: &Record) -> SyncResult<String> {
        self.identifier
            .get(record)
            .map(str::to_string)
            .ok_or_else(|| SyncError::NotIndexed {
                key: record.key().clone(),
            })
    }

    async fn persist_identifier(&self, key: RecordKey, object_id: String) -> SyncResult<()> {
        let patch = self.identifier_patch(&object_id);

        match self.options.identifier_write {
            IdentifierWrite::Await => match self.store.update_one(&key, &patch).await {
                Ok(()) => Ok(()),
                Err(source) => {
                    log_orphan(&key, &object_id, &source);
                    Err(SyncError::IdentifierNotPersisted {
                        key,
                        object_id,
                        source,
                    })
                }
            },
            IdentifierWrite::Detached => {
                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    if let Err(e) = store.update_one(&key, &patch).await {
                        log_orphan(&key, &object_id, &e);
                    }
                });
                Ok(())
            }
        }
    }
}
