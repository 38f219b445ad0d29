//! Domain types
//!
//! This module contains the core domain types for TourneySync:
//! - Newtypes for local, queue and server identifiers
//! - The set of syncable entity tables
//! - Replica records and their bookkeeping
//! - Change queue entries and retry policy constants
//! - Conflict descriptors handed to the resolver
//! - Conflict strategy names accepted in configuration
//! - Domain-specific error types

pub mod change;
pub mod conflict;
pub mod entity;
pub mod errors;
pub mod newtypes;
pub mod strategy;
pub mod table;

// Re-export commonly used types
pub use change::{
    retry_delay, ChangeQueueEntry, NewChange, Operation, MAX_RETRY_ATTEMPTS,
    PERMANENT_FAILURE_PREFIX,
};
pub use conflict::ConflictInfo;
pub use entity::{
    now_millis, parse_server_timestamp, EntityPatch, NewEntity, RecordFields, RecordStatus,
    SyncedEntity, ID_FIELD,
};
pub use errors::DomainError;
pub use newtypes::*;
pub use strategy::StrategyName;
pub use table::EntityTable;
