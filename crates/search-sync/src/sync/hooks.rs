//! Lifecycle hooks.
//!
//! The host record framework calls these after a record is created, updated
//! or deleted. Whether the index sees a create or an update is decided solely
//! by the presence of the identifier on the record.
//!
//! | Event | Identifier set | Identifier unset |
//! |-------|----------------|------------------|
//! | Created | update | create |
//! | Updated | update | per [`UnindexedUpdatePolicy`] |
//! | Deleted | delete | no-op |

use tracing::{debug, warn};

use crate::config::UnindexedUpdatePolicy;
use crate::error::SyncResult;
use crate::record::Record;

use super::IndexSync;

/// A record lifecycle event.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The record was created.
    Created(Record),
    /// The record was updated.
    Updated(Record),
    /// The record was deleted.
    Deleted(Record),
}

impl LifecycleEvent {
    /// Returns the record carried by the event.
    pub fn record(&self) -> &Record {
        match self {
            LifecycleEvent::Created(r) | LifecycleEvent::Updated(r) | LifecycleEvent::Deleted(r) => r,
        }
    }

    /// Returns the event name.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Created(_) => "created",
            LifecycleEvent::Updated(_) => "updated",
            LifecycleEvent::Deleted(_) => "deleted",
        }
    }
}

/// What a hook did to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// A new entry was created.
    Created {
        /// The assigned identifier.
        object_id: String,
    },
    /// An existing entry was replaced.
    Updated {
        /// The entry's identifier.
        object_id: String,
    },
    /// An entry was deleted.
    Deleted {
        /// The deleted entry's identifier.
        object_id: String,
    },
    /// Nothing was sent to the index.
    Skipped,
}

impl HookOutcome {
    /// Returns the identifier involved, if any.
    pub fn object_id(&self) -> Option<&str> {
        match self {
            HookOutcome::Created { object_id }
            | HookOutcome::Updated { object_id }
            | HookOutcome::Deleted { object_id } => Some(object_id),
            HookOutcome::Skipped => None,
        }
    }
}

impl IndexSync {
    /// Post-create hook.
    ///
    /// Creates an entry if the record has no identifier, otherwise updates
    /// the existing one (a re-save of an already indexed record).
    pub async fn on_create(&self, record: &mut Record) -> SyncResult<HookOutcome> {
        if self.identifier.is_set(record) {
            let object_id = self.update_object(record).await?;
            Ok(HookOutcome::Updated { object_id })
        } else {
            let object_id = self.add_object(record).await?;
            Ok(HookOutcome::Created { object_id })
        }
    }

    /// Post-update hook.
    pub async fn on_update(&self, record: &mut Record) -> SyncResult<HookOutcome> {
        if self.identifier.is_set(record) {
            let object_id = self.update_object(record).await?;
            return Ok(HookOutcome::Updated { object_id });
        }

        match self.options.unindexed_update {
            UnindexedUpdatePolicy::Create => {
                debug!(
                    primary_key = %record.key(),
                    "Update on unindexed record, creating index entry"
                );
                let object_id = self.add_object(record).await?;
                Ok(HookOutcome::Created { object_id })
            }
            UnindexedUpdatePolicy::Skip => {
                warn!(
                    primary_key = %record.key(),
                    "Update on unindexed record dropped"
                );
                Ok(HookOutcome::Skipped)
            }
        }
    }

    /// Post-delete hook. A record without an identifier is a no-op.
    pub async fn on_delete(&self, record: &Record) -> SyncResult<HookOutcome> {
        if !self.identifier.is_set(record) {
            debug!(primary_key = %record.key(), "Delete on unindexed record, nothing to do");
            return Ok(HookOutcome::Skipped);
        }
        let object_id = self.delete_object(record).await?;
        Ok(HookOutcome::Deleted { object_id })
    }

    /// Routes a lifecycle event to its hook.
    pub async fn dispatch(&self, event: LifecycleEvent) -> SyncResult<HookOutcome> {
        debug!(event = event.name(), primary_key = %event.record().key(), "Dispatching lifecycle event");
        match event {
            LifecycleEvent::Created(mut record) => self.on_create(&mut record).await,
            LifecycleEvent::Updated(mut record) => self.on_update(&mut record).await,
            LifecycleEvent::Deleted(record) => self.on_delete(&record).await,
        }
    }
}
