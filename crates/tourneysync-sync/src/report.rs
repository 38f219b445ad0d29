//! Per-cycle sync summary

/// Summary of a completed synchronization cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Queue entries acknowledged by the remote store
    pub pushed: u32,
    /// Entries that failed and will be retried next cycle
    pub push_failed: u32,
    /// Entries that failed for the last allowed time in this cycle
    pub permanently_failed: u32,
    /// Entries skipped because they had already failed permanently
    pub skipped_failed: u32,
    /// Server records inserted into the replica
    pub pulled_inserts: u32,
    /// Replica records overwritten by the server version
    pub overwritten: u32,
    /// Conflicts resolved without user involvement
    pub conflicts_resolved: u32,
    /// Conflicts written locally but flagged for a human
    pub conflicts_need_action: u32,
    /// Tables whose remote snapshot could not be fetched
    pub tables_skipped: u32,
    /// Non-fatal errors, in the order they occurred
    pub errors: Vec<String>,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
