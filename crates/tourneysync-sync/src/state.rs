//! Engine status and conflict notices

use std::fmt::{self, Display, Formatter};

use tourneysync_core::domain::{EntityTable, ServerId, SyncedEntity};

/// Aggregate status observed by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
    Offline,
    /// Last cycle aborted; carries the error message
    Error(String),
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Offline => "offline",
            SyncState::Error(_) => "error",
        }
    }

    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncState::Syncing)
    }
}

impl Display for SyncState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Error(message) => write!(f, "error: {message}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A conflict whose resolution needs a human
///
/// `resolved` is what was written locally in the meantime; the record is
/// flagged with the `conflict` sync status until it is edited again.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictNotice {
    pub table: EntityTable,
    pub record_id: ServerId,
    pub local_version: SyncedEntity,
    pub server_version: SyncedEntity,
    pub resolved: SyncedEntity,
}
