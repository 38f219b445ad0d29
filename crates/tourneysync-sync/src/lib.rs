//! TourneySync Sync - offline-first synchronization engine
//!
//! Provides:
//! - Push/pull sync cycles over the change queue and local replica
//! - Single-flight guard shared by timer and manual triggers
//! - Periodic scheduling with cancellation
//! - Connectivity glue and an explicit engine lifecycle holder
//!
//! ## Modules
//!
//! - [`engine`] - Sync engine and its push/pull phases
//! - [`connectivity`] - Online/offline signal forwarding
//! - [`registry`] - Owner of the running engine instance
//! - [`report`] - Per-cycle summary
//! - [`state`] - Engine status and conflict notices

pub mod connectivity;
pub mod engine;
pub mod registry;
pub mod report;
pub mod state;

pub use connectivity::{ConnectivityMonitor, ConnectivitySignal};
pub use engine::{ConflictCallback, EngineDeps, EngineOptions, StatusCallback, SyncEngine};
pub use registry::EngineRegistry;
pub use report::SyncReport;
pub use state::{ConflictNotice, SyncState};

use thiserror::Error;

use tourneysync_core::domain::{DomainError, EntityTable};

/// Errors raised while processing individual records in a cycle
#[derive(Debug, Error)]
pub enum SyncError {
    /// A domain-level error propagated from tourneysync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),

    /// A pulled record carries no usable `id` column
    #[error("Remote {table} record has no id")]
    RemoteRecordWithoutId { table: EntityTable },
}
