//! Remote store port (driven/secondary port)
//!
//! The authoritative server-side store, seen as an opaque per-table
//! request/response collaborator. Each call either returns data or an
//! error; the sync engine turns errors into queue and status bookkeeping
//! and never lets them reach the UI.

use crate::domain::{EntityTable, RecordFields, ServerId};

/// A record as returned by the remote store (column name to value)
pub type RemoteRecord = RecordFields;

/// Port trait for the authoritative remote store
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Fetches the full snapshot of a table
    async fn select(&self, table: EntityTable) -> anyhow::Result<Vec<RemoteRecord>>;

    /// Creates a record
    ///
    /// Returns the stored row when the store echoes it back; the row is
    /// expected to carry the server-assigned `id`.
    async fn insert(
        &self,
        table: EntityTable,
        payload: &RecordFields,
    ) -> anyhow::Result<Option<RemoteRecord>>;

    /// Updates the record with the given server id
    async fn update(
        &self,
        table: EntityTable,
        id: &ServerId,
        payload: &RecordFields,
    ) -> anyhow::Result<()>;

    /// Deletes the record with the given server id
    async fn delete(&self, table: EntityTable, id: &ServerId) -> anyhow::Result<()>;
}
