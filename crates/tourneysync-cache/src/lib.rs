//! TourneySync Cache - Local replica and change queue persistence
//!
//! SQLite-based storage for:
//! - The local replica of synced server tables
//! - The FIFO queue of unacknowledged local mutations
//!
//! ## Architecture
//!
//! This crate implements the `IReplicaStore` and `IChangeQueue` ports from
//! `tourneysync-core` using SQLite. It is a driven (secondary) adapter in
//! the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteReplicaStore`] - `IReplicaStore` implementation
//! - [`SqliteChangeQueue`] - `IChangeQueue` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use tourneysync_cache::{DatabasePool, SqliteChangeQueue, SqliteReplicaStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/tourneysync/replica.db")).await?;
//! let replica = SqliteReplicaStore::new(pool.pool().clone());
//! let queue = SqliteChangeQueue::new(pool.pool().clone());
//! // Hand both to the sync engine and the mutation use case...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod queue;
pub mod replica;

pub use pool::DatabasePool;
pub use queue::SqliteChangeQueue;
pub use replica::SqliteReplicaStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
