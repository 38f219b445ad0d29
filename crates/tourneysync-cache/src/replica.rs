//! SQLite implementation of IReplicaStore
//!
//! All synced tables share one `replica_records` table, discriminated by
//! `entity_table`. Server columns are stored as a JSON object so the
//! replica needs no schema knowledge of the tournament tables.
//!
//! ## Type Mapping
//!
//! | Domain Type      | SQL Type | Strategy                                   |
//! |------------------|----------|--------------------------------------------|
//! | EntityTable      | TEXT     | `as_str()` / `FromStr`                     |
//! | LocalId          | INTEGER  | AUTOINCREMENT rowid                        |
//! | ServerId         | TEXT     | `as_str()` / `ServerId::new()`             |
//! | RecordStatus     | TEXT     | `as_str()` / `FromStr`                     |
//! | DateTime<Utc>    | TEXT     | RFC 3339, `Z` suffix, precision preserved  |
//! | RecordFields     | TEXT     | serde_json object                          |

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use tourneysync_core::domain::{
    DomainError, EntityPatch, EntityTable, LocalId, NewEntity, RecordFields, RecordStatus,
    ServerId, SyncedEntity,
};
use tourneysync_core::ports::{IReplicaStore, RecordFilter};

use crate::CacheError;

/// SQLite-based implementation of the replica store port
#[derive(Clone)]
pub struct SqliteReplicaStore {
    pool: SqlitePool,
}

impl SqliteReplicaStore {
    /// Creates a new store over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of records held for a table
    pub async fn count(&self, table: EntityTable) -> anyhow::Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM replica_records WHERE entity_table = ?")
                .bind(table.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn timestamp_to_string(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn fields_to_string(fields: &RecordFields) -> Result<String, CacheError> {
    Ok(serde_json::to_string(fields)?)
}

fn fields_from_string(s: &str) -> Result<RecordFields, CacheError> {
    Ok(serde_json::from_str(s)?)
}

fn entity_from_row(row: &SqliteRow) -> Result<SyncedEntity, CacheError> {
    let local_id: i64 = row.get("local_id");
    let server_id: Option<String> = row.get("server_id");
    let status_str: String = row.get("sync_status");
    let last_modified: i64 = row.get("last_modified");
    let server_timestamp: Option<String> = row.get("server_timestamp");
    let fields_str: String = row.get("fields");

    let id = server_id
        .map(ServerId::new)
        .transpose()
        .map_err(|e: DomainError| CacheError::SerializationError(e.to_string()))?;
    let sync_status: RecordStatus = status_str
        .parse()
        .map_err(|e: DomainError| CacheError::SerializationError(e.to_string()))?;
    let server_timestamp = match server_timestamp {
        Some(ref s) if !s.is_empty() => Some(parse_datetime(s)?),
        _ => None,
    };

    Ok(SyncedEntity {
        id,
        local_id: LocalId::new(local_id),
        sync_status,
        last_modified,
        server_timestamp,
        fields: fields_from_string(&fields_str)?,
    })
}

// ============================================================================
// IReplicaStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IReplicaStore for SqliteReplicaStore {
    async fn get(
        &self,
        table: EntityTable,
        local_id: LocalId,
    ) -> anyhow::Result<Option<SyncedEntity>> {
        let row = sqlx::query("SELECT * FROM replica_records WHERE entity_table = ? AND local_id = ?")
            .bind(table.as_str())
            .bind(local_id.value())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(entity_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_server_id(
        &self,
        table: EntityTable,
        id: &ServerId,
    ) -> anyhow::Result<Option<SyncedEntity>> {
        let row =
            sqlx::query("SELECT * FROM replica_records WHERE entity_table = ? AND server_id = ?")
                .bind(table.as_str())
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(entity_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, table: EntityTable, record: NewEntity) -> anyhow::Result<LocalId> {
        let fields = fields_to_string(&record.fields)?;
        let result = sqlx::query(
            "INSERT INTO replica_records \
             (entity_table, server_id, sync_status, last_modified, server_timestamp, fields) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(table.as_str())
        .bind(record.id.as_ref().map(|id| id.as_str().to_string()))
        .bind(record.sync_status.as_str())
        .bind(record.last_modified)
        .bind(record.server_timestamp.as_ref().map(timestamp_to_string))
        .bind(&fields)
        .execute(&self.pool)
        .await?;

        let local_id = LocalId::new(result.last_insert_rowid());
        tracing::trace!(%table, %local_id, "Inserted replica record");
        Ok(local_id)
    }

    async fn update(
        &self,
        table: EntityTable,
        local_id: LocalId,
        patch: &EntityPatch,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM replica_records WHERE entity_table = ? AND local_id = ?")
            .bind(table.as_str())
            .bind(local_id.value())
            .fetch_optional(&mut *tx)
            .await?;
        let mut entity = match row {
            Some(ref r) => entity_from_row(r)?,
            None => {
                return Err(DomainError::NotFound {
                    table: table.to_string(),
                    local_id: local_id.value(),
                }
                .into())
            }
        };

        patch.apply_to(&mut entity)?;
        write_entity(&mut tx, table, &entity).await?;
        tx.commit().await?;

        tracing::trace!(%table, %local_id, "Patched replica record");
        Ok(())
    }

    async fn replace(&self, table: EntityTable, entity: &SyncedEntity) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Option<String>> = sqlx::query_scalar(
            "SELECT server_id FROM replica_records WHERE entity_table = ? AND local_id = ?",
        )
        .bind(table.as_str())
        .bind(entity.local_id.value())
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            None => {
                return Err(DomainError::NotFound {
                    table: table.to_string(),
                    local_id: entity.local_id.value(),
                }
                .into())
            }
            Some(Some(ref stored)) if entity.id.as_ref().map(ServerId::as_str) != Some(stored.as_str()) => {
                return Err(DomainError::InvalidId(format!(
                    "record {} already has server id {stored}",
                    entity.local_id
                ))
                .into())
            }
            Some(_) => {}
        }

        write_entity(&mut tx, table, entity).await?;
        tx.commit().await?;

        tracing::trace!(%table, local_id = %entity.local_id, "Replaced replica record");
        Ok(())
    }

    async fn delete(&self, table: EntityTable, local_id: LocalId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM replica_records WHERE entity_table = ? AND local_id = ?")
            .bind(table.as_str())
            .bind(local_id.value())
            .execute(&self.pool)
            .await?;

        tracing::trace!(%table, %local_id, "Deleted replica record");
        Ok(())
    }

    async fn list(
        &self,
        table: EntityTable,
        filter: &RecordFilter,
    ) -> anyhow::Result<Vec<SyncedEntity>> {
        let mut sql = String::from("SELECT * FROM replica_records WHERE entity_table = ?");
        let mut binds: Vec<String> = vec![table.as_str().to_string()];

        if let Some(status) = filter.status {
            sql.push_str(" AND sync_status = ?");
            binds.push(status.as_str().to_string());
        }

        if let Some(since) = filter.modified_since {
            sql.push_str(" AND last_modified > ?");
            binds.push(since.to_string());
        }

        sql.push_str(" ORDER BY local_id ASC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(entity_from_row(row)?);
        }

        Ok(records)
    }
}

/// Overwrites every column of an existing row with `entity`
async fn write_entity(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    table: EntityTable,
    entity: &SyncedEntity,
) -> Result<(), CacheError> {
    let fields = fields_to_string(&entity.fields)?;
    sqlx::query(
        "UPDATE replica_records SET \
         server_id = ?, sync_status = ?, last_modified = ?, server_timestamp = ?, fields = ? \
         WHERE entity_table = ? AND local_id = ?",
    )
    .bind(entity.id.as_ref().map(|id| id.as_str().to_string()))
    .bind(entity.sync_status.as_str())
    .bind(entity.last_modified)
    .bind(entity.server_timestamp.as_ref().map(timestamp_to_string))
    .bind(&fields)
    .bind(table.as_str())
    .bind(entity.local_id.value())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
