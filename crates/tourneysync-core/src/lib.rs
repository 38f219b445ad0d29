//! TourneySync Core - Domain types and ports for the offline-first replica
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `SyncedEntity`, `ChangeQueueEntry`, `ConflictInfo`, `EntityTable`
//! - **Use cases** - `MutateRecordUseCase` (optimistic local writes + queue append)
//! - **Port definitions** - Traits for adapters: `IRemoteStore`, `IReplicaStore`, `IChangeQueue`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module holds plain data and invariants with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`tourneysync-cache` for the local store, `tourneysync-remote` for the
//! authoritative server). The sync engine lives in `tourneysync-sync` and
//! depends only on the ports declared here.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
