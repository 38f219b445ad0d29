//! Error types for the conflict engine

use thiserror::Error;

/// Errors that can occur while configuring conflict resolution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// Strategy override names a table that is not synced
    #[error("unknown table in strategy override: {0}")]
    UnknownTable(String),

    /// Strategy override names an unknown strategy
    #[error("invalid strategy for {table}: '{strategy}'")]
    InvalidStrategy { table: String, strategy: String },
}
