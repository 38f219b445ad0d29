//! TourneySync Conflict - conflict detection and resolution
//!
//! This crate decides what happens when a local record with unacknowledged
//! edits meets a newer server version:
//! - Per-table strategies with configuration overrides ([`policy`])
//! - Detection of diverged record pairs ([`detector`])
//! - Field-level merge of match results ([`merge`])
//! - Pluggable dispute checks for merged scores ([`dispute`])

pub mod detector;
pub mod dispute;
pub mod error;
pub mod merge;
pub mod policy;
pub mod resolver;

pub use detector::{awaits_user, has_conflict, ConflictDetector, DetectionResult};
pub use dispute::{DisputePredicate, ScoreSumExceeds};
pub use error::ConflictError;
pub use merge::{merge_match, MatchMerge};
pub use policy::{default_strategy, parse_strategy, ConflictStrategy, MergeFn, StrategyMap};
pub use resolver::{ConflictResolver, Resolution};
