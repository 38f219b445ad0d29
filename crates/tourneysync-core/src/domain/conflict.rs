//! Conflict descriptors
//!
//! [`ConflictInfo`] is built during the pull phase when a local record with
//! unacknowledged edits meets a fresher server version. It is never
//! persisted; the resolver consumes it immediately.

use serde::Serialize;

use super::entity::SyncedEntity;
use super::newtypes::ServerId;
use super::table::EntityTable;

/// A (local, server) pair for the same record that disagree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictInfo {
    pub local_version: SyncedEntity,
    pub server_version: SyncedEntity,
    pub table: EntityTable,
    pub record_id: ServerId,
}

impl ConflictInfo {
    #[must_use]
    pub fn new(
        table: EntityTable,
        record_id: ServerId,
        local_version: SyncedEntity,
        server_version: SyncedEntity,
    ) -> Self {
        Self {
            local_version,
            server_version,
            table,
            record_id,
        }
    }
}
