//! Change queue port (driven/secondary port)
//!
//! Ordered, durable log of local mutations awaiting acknowledgment from
//! the remote store, with retry bookkeeping.
//!
//! ## Design Notes
//!
//! - Entries are immutable apart from `attempts`/`last_error`, which only
//!   `mark_failed` touches.
//! - The retry cap and failure marker are the constants in
//!   [`crate::domain::change`], shared with the sync engine.

use crate::domain::{ChangeQueueEntry, NewChange, QueueEntryId};

/// Port trait for the pending-mutation queue
#[async_trait::async_trait]
pub trait IChangeQueue: Send + Sync {
    /// Appends a mutation and returns its sequence number
    async fn enqueue(&self, change: NewChange) -> anyhow::Result<QueueEntryId>;

    /// All entries, oldest first (by enqueue timestamp, then sequence)
    ///
    /// Includes permanently failed entries; callers decide whether to skip them.
    async fn list_pending(&self) -> anyhow::Result<Vec<ChangeQueueEntry>>;

    /// Removes an entry after the remote store applied it
    async fn dequeue(&self, id: QueueEntryId) -> anyhow::Result<()>;

    /// Records a failed push attempt
    ///
    /// Returns `true` while the entry may still be retried. When the new
    /// attempt count reaches the retry cap the stored error is prefixed
    /// with `PERMANENT_FAILURE: ` and `false` is returned.
    async fn mark_failed(&self, id: QueueEntryId, error: &str) -> anyhow::Result<bool>;

    /// Entries whose attempts reached the retry cap
    async fn list_failed(&self) -> anyhow::Result<Vec<ChangeQueueEntry>>;

    /// Purges entries whose attempts reached the retry cap; returns how many
    async fn clear_failed(&self) -> anyhow::Result<u64>;

    /// True if any entry is still below the retry cap
    async fn has_retryable(&self) -> anyhow::Result<bool>;

    /// Number of entries in the queue, failed or not
    async fn pending_count(&self) -> anyhow::Result<u64>;
}
