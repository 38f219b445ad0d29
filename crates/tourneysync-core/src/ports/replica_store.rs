//! Local replica store port (driven/secondary port)
//!
//! Durable per-table collection of [`SyncedEntity`] records, keyed by the
//! locally-assigned [`LocalId`] and indexed by server id.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//!   The only domain error surfaced is `DomainError::NotFound` from
//!   `update`/`replace` on a missing record.
//! - `local_id` is assigned by the store and never changes afterwards,
//!   whatever patches or replacements are applied.

use crate::domain::{
    EntityPatch, EntityTable, LocalId, NewEntity, RecordStatus, ServerId, SyncedEntity,
};

// ============================================================================
// RecordFilter
// ============================================================================

/// Filter criteria for listing replica records
///
/// All fields are optional; when `None`, no filtering is applied for that field.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Only records with this sync status
    pub status: Option<RecordStatus>,
    /// Only records modified locally after this time (epoch ms)
    pub modified_since: Option<i64>,
}

impl RecordFilter {
    /// Creates a new empty filter (matches all records)
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sync status filter
    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the local modification time filter
    pub fn with_modified_since(mut self, millis: i64) -> Self {
        self.modified_since = Some(millis);
        self
    }

    /// Returns true if no filters are set
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.modified_since.is_none()
    }
}

// ============================================================================
// IReplicaStore trait
// ============================================================================

/// Port trait for the local replica of server tables
#[async_trait::async_trait]
pub trait IReplicaStore: Send + Sync {
    /// Retrieves a record by its local id
    async fn get(&self, table: EntityTable, local_id: LocalId)
        -> anyhow::Result<Option<SyncedEntity>>;

    /// Retrieves a record by its server-assigned id
    async fn find_by_server_id(
        &self,
        table: EntityTable,
        id: &ServerId,
    ) -> anyhow::Result<Option<SyncedEntity>>;

    /// Inserts a new record and returns the local id assigned to it
    async fn insert(&self, table: EntityTable, record: NewEntity) -> anyhow::Result<LocalId>;

    /// Applies a partial update to an existing record
    async fn update(
        &self,
        table: EntityTable,
        local_id: LocalId,
        patch: &EntityPatch,
    ) -> anyhow::Result<()>;

    /// Overwrites every stored column of `entity.local_id` with `entity`
    ///
    /// Fields absent from `entity` are dropped from the stored record.
    async fn replace(&self, table: EntityTable, entity: &SyncedEntity) -> anyhow::Result<()>;

    /// Deletes a record; deleting a missing record is not an error
    async fn delete(&self, table: EntityTable, local_id: LocalId) -> anyhow::Result<()>;

    /// Lists records of a table ordered by local id
    async fn list(
        &self,
        table: EntityTable,
        filter: &RecordFilter,
    ) -> anyhow::Result<Vec<SyncedEntity>>;
}
