//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the sync core depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Authoritative server tables (select/insert/update/delete)
//! - [`IReplicaStore`] - Durable local replica of those tables
//! - [`IChangeQueue`] - Durable FIFO of unacknowledged local mutations

pub mod change_queue;
pub mod remote_store;
pub mod replica_store;

pub use change_queue::IChangeQueue;
pub use remote_store::{IRemoteStore, RemoteRecord};
pub use replica_store::{IReplicaStore, RecordFilter};
