//! Conflict detection during the pull phase

use tracing::trace;

use tourneysync_core::domain::{ConflictInfo, EntityTable, RecordStatus, SyncedEntity};

/// Whether a local record and a freshly pulled server record conflict
///
/// A synced local record never conflicts: the server copy simply replaces
/// it. Otherwise the local edit conflicts when it is newer than a known
/// server timestamp.
pub fn has_conflict(local: &SyncedEntity, server: &SyncedEntity) -> bool {
    if local.is_synced() {
        return false;
    }
    let server_ms = server.server_timestamp_ms();
    server_ms > 0 && local.last_modified > server_ms
}

/// Whether a record flagged for user action still faces the same server version
///
/// Such a record was already resolved against this server copy; it stays
/// as stored until the server moves on or the user edits it locally.
pub fn awaits_user(local: &SyncedEntity, server: &SyncedEntity) -> bool {
    local.sync_status == RecordStatus::Conflict
        && local.server_timestamp_ms() == server.server_timestamp_ms()
}

/// Result of checking one record pair
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionResult {
    /// Server copy can overwrite the local one
    NoConflict,
    /// Already flagged against this server version; leave it alone
    AwaitingUser,
    /// Versions diverged
    Conflicted(Box<ConflictInfo>),
}

impl DetectionResult {
    pub fn is_conflict(&self) -> bool {
        matches!(self, DetectionResult::Conflicted(_))
    }
}

/// Builds [`ConflictInfo`] values for diverged record pairs
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        &self,
        table: EntityTable,
        local: &SyncedEntity,
        server: &SyncedEntity,
    ) -> DetectionResult {
        let record_id = match (&server.id, &local.id) {
            (Some(id), _) | (None, Some(id)) => id.clone(),
            (None, None) => return DetectionResult::NoConflict,
        };

        if awaits_user(local, server) {
            trace!(%table, %record_id, "Conflict still awaiting user");
            return DetectionResult::AwaitingUser;
        }

        if !has_conflict(local, server) {
            trace!(%table, %record_id, "No conflict");
            return DetectionResult::NoConflict;
        }

        DetectionResult::Conflicted(Box::new(ConflictInfo::new(
            table,
            record_id,
            local.clone(),
            server.clone(),
        )))
    }
}
