//! Use cases (interactors) for TourneySync
//!
//! Thin coordinators over the ports. The sync cycle itself lives in
//! `tourneysync-sync`; the use cases here are what the UI layer calls.
//!
//! ## Use Cases
//!
//! - [`MutateRecordUseCase`] - Optimistic create/update/delete plus read accessors

pub mod mutate_record;

pub use mutate_record::MutateRecordUseCase;
