//! Domain error types
//!
//! Errors raised by domain operations: unknown entity tables, malformed
//! identifiers, and records missing from the local replica.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Table name is not one of the syncable entity tables
    #[error("Unknown entity table: {0}")]
    UnknownTable(String),

    /// Conflict strategy name not recognized
    #[error("Unknown conflict strategy: {0}")]
    UnknownStrategy(String),

    /// Unknown change queue operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Unknown record sync status
    #[error("Invalid sync status: {0}")]
    InvalidStatus(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// No local record with this local id
    #[error("Record not found: {table}/{local_id}")]
    NotFound {
        /// Entity table that was searched
        table: String,
        /// Local id that was not found
        local_id: i64,
    },

    /// An update or delete has no server id to address
    #[error("Missing server record id for {table}/{local_id}")]
    MissingRecordId {
        /// Entity table of the record
        table: String,
        /// Local id of the record
        local_id: i64,
    },
}
