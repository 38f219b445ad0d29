//! SQLite pool shared by the replica store and the change queue
//!
//! Both adapters live in one database file so that a local write and its
//! queue entry land in the same storage. The schema is applied on open.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::CacheError;

/// Schema for `replica_records` and `change_queue`
const SCHEMA: &str = include_str!("migrations/20261001_initial.sql");

/// Upper bound on connections to a database file
const MAX_FILE_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the replica database
///
/// Cloning is cheap; clones share the same connections.
#[derive(Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the replica database at `db_path`, creating file and schema
    /// on first use
    ///
    /// The journal runs in WAL mode so pull-phase reads do not block on a
    /// local write.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        ensure_parent_dir(db_path)?;

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_FILE_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "cannot open replica database {}: {e}",
                    db_path.display()
                ))
            })?;

        apply_schema(&pool).await?;
        info!(path = %db_path.display(), "Replica database ready");

        Ok(Self { pool })
    }

    /// Replica held in memory, used by tests
    ///
    /// An in-memory SQLite database belongs to a single connection, so the
    /// pool is capped at one.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory replica: {e}")))?;

        apply_schema(&pool).await?;
        debug!("In-memory replica ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes all connections; later queries on any clone fail
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn ensure_parent_dir(db_path: &Path) -> Result<(), CacheError> {
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "cannot create directory {}: {e}",
                    parent.display()
                ))
            }),
        _ => Ok(()),
    }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), CacheError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(e.to_string()))?;
    debug!("Replica schema applied");
    Ok(())
}
