//! SQLite implementation of IChangeQueue
//!
//! Entries live in the `change_queue` table. The AUTOINCREMENT `id` is
//! the FIFO tiebreaker for entries enqueued within the same millisecond.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use tourneysync_core::domain::{
    now_millis, ChangeQueueEntry, DomainError, EntityTable, LocalId, NewChange, Operation,
    QueueEntryId, RecordFields, ServerId, MAX_RETRY_ATTEMPTS, PERMANENT_FAILURE_PREFIX,
};
use tourneysync_core::ports::IChangeQueue;

use crate::CacheError;

/// SQLite-based implementation of the change queue port
#[derive(Clone)]
pub struct SqliteChangeQueue {
    pool: SqlitePool,
}

impl SqliteChangeQueue {
    /// Creates a new queue over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn domain_err(e: DomainError) -> CacheError {
    CacheError::SerializationError(e.to_string())
}

fn entry_from_row(row: &SqliteRow) -> Result<ChangeQueueEntry, CacheError> {
    let id: i64 = row.get("id");
    let table_str: String = row.get("entity_table");
    let record_id: Option<String> = row.get("record_id");
    let local_id: i64 = row.get("local_id");
    let operation_str: String = row.get("operation");
    let payload_str: String = row.get("payload");
    let timestamp: i64 = row.get("timestamp");
    let attempts: i64 = row.get("attempts");
    let last_error: Option<String> = row.get("last_error");

    let table: EntityTable = table_str.parse().map_err(domain_err)?;
    let operation: Operation = operation_str.parse().map_err(domain_err)?;
    let record_id = record_id.map(ServerId::new).transpose().map_err(domain_err)?;
    let payload: RecordFields = serde_json::from_str(&payload_str)?;

    Ok(ChangeQueueEntry {
        id: QueueEntryId::new(id),
        table,
        record_id,
        local_id: LocalId::new(local_id),
        operation,
        payload,
        timestamp,
        attempts: u32::try_from(attempts).unwrap_or(0),
        last_error,
    })
}

#[async_trait::async_trait]
impl IChangeQueue for SqliteChangeQueue {
    async fn enqueue(&self, change: NewChange) -> anyhow::Result<QueueEntryId> {
        let payload = serde_json::to_string(&change.payload).map_err(CacheError::from)?;

        let result = sqlx::query(
            "INSERT INTO change_queue \
             (entity_table, record_id, local_id, operation, payload, timestamp, attempts) \
             VALUES (?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(change.table.as_str())
        .bind(change.record_id.as_ref().map(|id| id.as_str().to_string()))
        .bind(change.local_id.value())
        .bind(change.operation.as_str())
        .bind(&payload)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        let id = QueueEntryId::new(result.last_insert_rowid());
        tracing::debug!(
            entry_id = %id,
            table = %change.table,
            operation = %change.operation,
            local_id = %change.local_id,
            "Enqueued change"
        );
        Ok(id)
    }

    async fn list_pending(&self) -> anyhow::Result<Vec<ChangeQueueEntry>> {
        let rows = sqlx::query("SELECT * FROM change_queue ORDER BY timestamp ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(entry_from_row(row)?);
        }
        Ok(entries)
    }

    async fn dequeue(&self, id: QueueEntryId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM change_queue WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        tracing::trace!(entry_id = %id, "Dequeued change");
        Ok(())
    }

    async fn mark_failed(&self, id: QueueEntryId, error: &str) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let attempts: Option<i64> =
            sqlx::query_scalar("SELECT attempts FROM change_queue WHERE id = ?")
                .bind(id.value())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(attempts) = attempts else {
            tracing::warn!(entry_id = %id, "mark_failed on missing queue entry");
            return Ok(false);
        };

        let attempts = attempts + 1;
        let permanent = attempts >= i64::from(MAX_RETRY_ATTEMPTS);
        let last_error = if permanent {
            format!("{PERMANENT_FAILURE_PREFIX}{error}")
        } else {
            error.to_string()
        };

        sqlx::query("UPDATE change_queue SET attempts = ?, last_error = ? WHERE id = ?")
            .bind(attempts)
            .bind(&last_error)
            .bind(id.value())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if permanent {
            tracing::warn!(entry_id = %id, attempts, error, "Change permanently failed");
        } else {
            tracing::debug!(entry_id = %id, attempts, error, "Change failed, will retry");
        }
        Ok(!permanent)
    }

    async fn list_failed(&self) -> anyhow::Result<Vec<ChangeQueueEntry>> {
        let rows =
            sqlx::query("SELECT * FROM change_queue WHERE attempts >= ? ORDER BY timestamp ASC, id ASC")
                .bind(i64::from(MAX_RETRY_ATTEMPTS))
                .fetch_all(&self.pool)
                .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(entry_from_row(row)?);
        }
        Ok(entries)
    }

    async fn clear_failed(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM change_queue WHERE attempts >= ?")
            .bind(i64::from(MAX_RETRY_ATTEMPTS))
            .execute(&self.pool)
            .await?;

        let cleared = result.rows_affected();
        tracing::info!(cleared, "Cleared permanently failed changes");
        Ok(cleared)
    }

    async fn has_retryable(&self) -> anyhow::Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM change_queue WHERE attempts < ? LIMIT 1")
            .bind(i64::from(MAX_RETRY_ATTEMPTS))
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn pending_count(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM change_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
