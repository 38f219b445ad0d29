//! Change queue entries
//!
//! A [`ChangeQueueEntry`] is one local mutation that the server has not
//! acknowledged yet. Entries are created before any network call and
//! removed only after the remote store applied them (or after the user
//! clears a permanently failed entry).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::entity::RecordFields;
use super::errors::DomainError;
use super::newtypes::{LocalId, QueueEntryId, ServerId};
use super::table::EntityTable;

/// Failed push attempts after which an entry is no longer retried
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

/// Prefix on `last_error` of entries that exhausted their attempts
pub const PERMANENT_FAILURE_PREFIX: &str = "PERMANENT_FAILURE: ";

/// Base delay of the advisory retry backoff
pub const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Cap of the advisory retry backoff
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Advisory backoff for an entry that failed `attempts` times
///
/// `min(1000 * 2^attempts, 30000)` milliseconds. The engine does not
/// schedule entries individually; this is a hint for UI and callers.
#[must_use]
pub fn retry_delay(attempts: u32) -> Duration {
    // 2^15 * 1000 already exceeds the cap
    let exp = attempts.min(15);
    let millis = BASE_RETRY_DELAY_MS
        .saturating_mul(1u64 << exp)
        .min(MAX_RETRY_DELAY_MS);
    Duration::from_millis(millis)
}

/// Kind of mutation recorded in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(DomainError::InvalidOperation(other.to_string())),
        }
    }
}

/// A pending local mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeQueueEntry {
    pub id: QueueEntryId,
    pub table: EntityTable,
    /// Server id; required for update/delete by the time the entry is pushed
    pub record_id: Option<ServerId>,
    pub local_id: LocalId,
    pub operation: Operation,
    pub payload: RecordFields,
    /// Enqueue time in epoch milliseconds
    pub timestamp: i64,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl ChangeQueueEntry {
    /// True once the entry has used up its retry budget
    #[must_use]
    pub fn is_permanently_failed(&self) -> bool {
        self.attempts >= MAX_RETRY_ATTEMPTS
    }

    #[must_use]
    pub fn can_retry(&self) -> bool {
        !self.is_permanently_failed()
    }

    /// Advisory delay before the next attempt
    #[must_use]
    pub fn next_retry_delay(&self) -> Duration {
        retry_delay(self.attempts)
    }
}

/// A mutation about to be appended to the queue
#[derive(Debug, Clone, PartialEq)]
pub struct NewChange {
    pub table: EntityTable,
    pub record_id: Option<ServerId>,
    pub local_id: LocalId,
    pub operation: Operation,
    pub payload: RecordFields,
}

impl NewChange {
    #[must_use]
    pub fn new(
        table: EntityTable,
        record_id: Option<ServerId>,
        local_id: LocalId,
        operation: Operation,
        payload: RecordFields,
    ) -> Self {
        Self {
            table,
            record_id,
            local_id,
            operation,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(attempts: u32) -> ChangeQueueEntry {
        ChangeQueueEntry {
            id: QueueEntryId::new(1),
            table: EntityTable::Matches,
            record_id: None,
            local_id: LocalId::new(1),
            operation: Operation::Insert,
            payload: RecordFields::new(),
            timestamp: 0,
            attempts,
            last_error: None,
        }
    }

    #[test]
    fn test_retry_delay_formula() {
        assert_eq!(retry_delay(0), Duration::from_millis(1000));
        assert_eq!(retry_delay(1), Duration::from_millis(2000));
        assert_eq!(retry_delay(3), Duration::from_millis(8000));
        assert_eq!(retry_delay(4), Duration::from_millis(16_000));
        assert_eq!(retry_delay(5), Duration::from_millis(30_000));
        assert_eq!(retry_delay(10), Duration::from_millis(30_000));
        assert_eq!(retry_delay(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn test_permanent_failure_threshold() {
        assert!(entry(0).can_retry());
        assert!(entry(4).can_retry());
        assert!(entry(5).is_permanently_failed());
        assert!(entry(6).is_permanently_failed());
    }

    #[test]
    fn test_operation_strings() {
        for op in [Operation::Insert, Operation::Update, Operation::Delete] {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
        assert!("upsert".parse::<Operation>().is_err());
    }
}
