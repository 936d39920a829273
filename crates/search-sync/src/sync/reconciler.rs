//! Collection-wide reconciliation.
//!
//! Rebuilds the index from the record store. A full rebuild (`force`) first
//! empties the index and clears every stored identifier, so every record is
//! re-submitted; otherwise only records without an identifier are pushed.
//!
//! Identifiers returned by the batch create are matched to records purely by
//! position. The index is trusted to preserve submission order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::{Attributes, FieldPatch, RecordFilter};
use crate::error::{IndexError, PersistFailure, SyncError, SyncResult};
use crate::record::RecordKey;

use super::{IndexSync, log_orphan};

/// Request for a bulk sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Clear the index and all identifiers before syncing.
    #[serde(default)]
    pub force: bool,
}

impl SyncRequest {
    /// Incremental sync: only records without an identifier.
    pub fn incremental() -> Self {
        Self { force: false }
    }

    /// Full rebuild.
    pub fn force() -> Self {
        Self { force: true }
    }
}

/// Summary of a completed bulk sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Unique job identifier, for correlating logs.
    pub job_id: String,

    /// Identifiers cleared before the sync (only for forced syncs).
    pub cleared: Option<u64>,

    /// Records submitted to the index.
    pub submitted: usize,

    /// Identifiers written back to the store.
    pub persisted: usize,

    /// When the sync started.
    pub started_at: DateTime<Utc>,

    /// When the sync completed.
    pub completed_at: DateTime<Utc>,
}

impl SyncReport {
    fn new(job_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            cleared: None,
            submitted: 0,
            persisted: 0,
            started_at,
            completed_at: started_at,
        }
    }

    /// Returns true if every submitted record got its identifier.
    pub fn is_complete(&self) -> bool {
        self.submitted == self.persisted
    }

    /// Returns the wall time of the sync in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}

impl IndexSync {
    /// Empties the index, then clears the identifier on every record holding
    /// one.
    ///
    /// The index is cleared first. If the process dies in between, records
    /// keep identifiers that point at nothing; the next forced sync repairs
    /// that. Returns the number of records whose identifier was cleared.
    pub async fn clear_index(&self) -> SyncResult<u64> {
        self.index.clear_index().await?;
        debug!(index = %self.options.index(), "Cleared search index");

        let cleared = self
            .store
            .update_many(
                &RecordFilter::Set(self.identifier.name().to_string()),
                &FieldPatch::new().clear(self.identifier.name()),
            )
            .await?;

        info!(
            index = %self.options.index(),
            cleared,
            "Cleared search index and stored identifiers"
        );
        Ok(cleared)
    }

    /// Pushes every unindexed record to the index in one batch.
    ///
    /// Identifier writes run concurrently and are all awaited. Failed writes
    /// are not rolled back: the entries exist in the index and the call
    /// fails with [`SyncError::IncompletePersistence`] listing the records
    /// left without an identifier.
    pub async fn sync_all(&self, request: SyncRequest) -> SyncResult<SyncReport> {
        let mut report = SyncReport::new(Uuid::new_v4().to_string(), Utc::now());
        info!(
            job_id = %report.job_id,
            index = %self.options.index(),
            force = request.force,
            "Starting bulk sync"
        );

        if request.force {
            report.cleared = Some(self.clear_index().await?);
        }

        let records = self
            .store
            .find(&RecordFilter::Unset(self.identifier.name().to_string()), None)
            .await?;

        if records.is_empty() {
            report.completed_at = Utc::now();
            info!(job_id = %report.job_id, "Bulk sync found nothing to submit");
            return Ok(report);
        }

        let objects: Vec<Attributes> = records
            .iter()
            .map(|record| self.projection.extract(record))
            .collect();
        report.submitted = objects.len();

        let object_ids = self.index.add_objects(objects).await?;
        if object_ids.len() != report.submitted {
            error!(
                job_id = %report.job_id,
                submitted = report.submitted,
                returned = object_ids.len(),
                "Batch create returned a mismatched identifier list, nothing persisted"
            );
            return Err(IndexError::BatchMismatch {
                submitted: report.submitted,
                returned: object_ids.len(),
            }
            .into());
        }

        let mut pending: HashMap<RecordKey, String> = HashMap::with_capacity(records.len());
        let mut tasks = JoinSet::new();

        for (record, object_id) in records.into_iter().zip(object_ids) {
            let store = Arc::clone(&self.store);
            let patch = self.identifier_patch(&object_id);
            let key = record.key().clone();
            pending.insert(key.clone(), object_id.clone());

            tasks.spawn(async move {
                let result = store.update_one(&key, &patch).await;
                (key, object_id, result)
            });
        }

        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, _, Ok(()))) => {
                    pending.remove(&key);
                    report.persisted += 1;
                }
                Ok((key, object_id, Err(e))) => {
                    pending.remove(&key);
                    log_orphan(&key, &object_id, &e);
                    failed.push(PersistFailure {
                        key,
                        object_id,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(job_id = %report.job_id, error = %e, "Identifier write task failed");
                }
            }
        }

        // Whatever is still pending belongs to a task that panicked or was cancelled.
        for (key, object_id) in pending {
            failed.push(PersistFailure {
                key,
                object_id,
                message: "identifier write task aborted".to_string(),
            });
        }

        report.completed_at = Utc::now();

        if !failed.is_empty() {
            error!(
                job_id = %report.job_id,
                persisted = report.persisted,
                failed = failed.len(),
                "Bulk sync left records without identifiers"
            );
            return Err(SyncError::IncompletePersistence {
                persisted: report.persisted,
                failed,
            });
        }

        info!(
            job_id = %report.job_id,
            submitted = report.submitted,
            persisted = report.persisted,
            duration_ms = report.duration_ms(),
            "Bulk sync completed"
        );
        Ok(report)
    }
}
