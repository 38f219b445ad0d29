//! Local mutation use case
//!
//! Entry point for the UI layer to create, edit and delete records while
//! online or offline. Every mutation is written through to the local
//! replica first (so reads see it immediately) and then appended to the
//! change queue; no network call is made here.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::entity::ID_FIELD;
use crate::domain::{
    now_millis, DomainError, EntityPatch, EntityTable, LocalId, NewChange, NewEntity, Operation,
    RecordFields, RecordStatus, ServerId, SyncedEntity,
};
use crate::ports::{IChangeQueue, IReplicaStore, RecordFilter};

/// Use case for optimistic local mutations
///
/// Shares the replica and queue with the sync engine; the engine drains
/// what this use case appends.
pub struct MutateRecordUseCase {
    replica: Arc<dyn IReplicaStore + Send + Sync>,
    queue: Arc<dyn IChangeQueue + Send + Sync>,
}

impl MutateRecordUseCase {
    /// Creates a new MutateRecordUseCase
    ///
    /// # Arguments
    ///
    /// * `replica` - Local replica that UI reads come from
    /// * `queue` - Change queue drained by the sync engine
    pub fn new(
        replica: Arc<dyn IReplicaStore + Send + Sync>,
        queue: Arc<dyn IChangeQueue + Send + Sync>,
    ) -> Self {
        Self { replica, queue }
    }

    /// Creates a record locally and queues its insert
    ///
    /// Any `id` key in `fields` is ignored: the server assigns ids.
    ///
    /// # Returns
    ///
    /// The local id of the new record, usable before the server id exists
    pub async fn create(&self, table: EntityTable, mut fields: RecordFields) -> Result<LocalId> {
        fields.remove(ID_FIELD);
        let now = now_millis();

        let local_id = self
            .replica
            .insert(table, NewEntity::pending(fields.clone(), now))
            .await
            .context("Failed to write new record to local replica")?;

        let entry_id = self
            .queue
            .enqueue(NewChange::new(table, None, local_id, Operation::Insert, fields))
            .await
            .context("Failed to queue insert")?;

        debug!(%table, %local_id, %entry_id, "Queued insert");
        Ok(local_id)
    }

    /// Patches a record locally and queues the update
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no record has this local id
    pub async fn update(
        &self,
        table: EntityTable,
        local_id: LocalId,
        mut fields: RecordFields,
    ) -> Result<()> {
        fields.remove(ID_FIELD);
        let existing = self.require(table, local_id).await?;

        let patch = EntityPatch::new()
            .with_status(RecordStatus::Pending)
            .with_last_modified(now_millis())
            .with_fields(fields.clone());
        self.replica
            .update(table, local_id, &patch)
            .await
            .context("Failed to patch local record")?;

        let entry_id = self
            .queue
            .enqueue(NewChange::new(
                table,
                existing.id,
                local_id,
                Operation::Update,
                fields,
            ))
            .await
            .context("Failed to queue update")?;

        debug!(%table, %local_id, %entry_id, "Queued update");
        Ok(())
    }

    /// Marks a record as pending deletion and queues the delete
    ///
    /// The local record is removed by the sync engine once the server
    /// acknowledged the delete.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no record has this local id
    pub async fn delete(&self, table: EntityTable, local_id: LocalId) -> Result<()> {
        let existing = self.require(table, local_id).await?;

        let patch = EntityPatch::new()
            .with_status(RecordStatus::Pending)
            .with_last_modified(now_millis());
        self.replica
            .update(table, local_id, &patch)
            .await
            .context("Failed to mark local record for deletion")?;

        let entry_id = self
            .queue
            .enqueue(NewChange::new(
                table,
                existing.id,
                local_id,
                Operation::Delete,
                RecordFields::new(),
            ))
            .await
            .context("Failed to queue delete")?;

        debug!(%table, %local_id, %entry_id, "Queued delete");
        Ok(())
    }

    /// Reads a record by local id
    pub async fn get(&self, table: EntityTable, local_id: LocalId) -> Result<Option<SyncedEntity>> {
        self.replica.get(table, local_id).await
    }

    /// Reads a record by server id
    pub async fn find_by_server_id(
        &self,
        table: EntityTable,
        id: &ServerId,
    ) -> Result<Option<SyncedEntity>> {
        self.replica.find_by_server_id(table, id).await
    }

    /// Lists records of a table, synced or pending
    pub async fn list(&self, table: EntityTable, filter: &RecordFilter) -> Result<Vec<SyncedEntity>> {
        self.replica.list(table, filter).await
    }

    async fn require(&self, table: EntityTable, local_id: LocalId) -> Result<SyncedEntity> {
        self.replica
            .get(table, local_id)
            .await
            .context("Failed to read local record")?
            .ok_or_else(|| {
                DomainError::NotFound {
                    table: table.to_string(),
                    local_id: local_id.value(),
                }
                .into()
            })
    }
}
