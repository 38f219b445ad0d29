//! Conflict resolution
//!
//! [`ConflictResolver`] turns a [`ConflictInfo`] into the version that is
//! written to the local replica. It never touches storage or the network.

use std::sync::Arc;

use tracing::debug;

use tourneysync_core::config::ConflictsConfig;
use tourneysync_core::domain::{ConflictInfo, EntityTable, SyncedEntity};

use crate::dispute::{DisputePredicate, ScoreSumExceeds};
use crate::error::ConflictError;
use crate::merge::merge_match;
use crate::policy::{ConflictStrategy, MergeFn, StrategyMap};

/// Result of resolving one conflict
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Version to store locally; always carries the local `local_id`
    pub resolved: SyncedEntity,
    /// Strategy that produced it
    pub strategy: ConflictStrategy,
    /// A human has to look at this record
    pub requires_user_action: bool,
}

/// Applies per-table conflict strategies
#[derive(Clone)]
pub struct ConflictResolver {
    strategies: StrategyMap,
    dispute: Arc<dyn DisputePredicate>,
}

impl ConflictResolver {
    pub fn new(strategies: StrategyMap, dispute: Arc<dyn DisputePredicate>) -> Self {
        Self {
            strategies,
            dispute,
        }
    }

    /// Builds a resolver from the `conflicts` configuration section
    pub fn from_config(config: &ConflictsConfig) -> Self {
        Self::new(
            StrategyMap::from_overrides(&config.strategies),
            Arc::new(ScoreSumExceeds::from_config(config)),
        )
    }

    /// Like [`from_config`](Self::from_config) but fails on a bad override
    pub fn try_from_config(config: &ConflictsConfig) -> Result<Self, ConflictError> {
        Ok(Self::new(
            StrategyMap::try_from_overrides(&config.strategies)?,
            Arc::new(ScoreSumExceeds::from_config(config)),
        ))
    }

    pub fn strategy_for(&self, table: EntityTable) -> ConflictStrategy {
        self.strategies.strategy_for(table)
    }

    /// Resolves a conflict with the table's strategy, or `strategy` if given
    pub fn resolve(
        &self,
        conflict: &ConflictInfo,
        strategy: Option<ConflictStrategy>,
    ) -> Resolution {
        let strategy = strategy.unwrap_or_else(|| self.strategy_for(conflict.table));
        let local = &conflict.local_version;
        let server = &conflict.server_version;

        let (mut resolved, requires_user_action) = match strategy {
            ConflictStrategy::ClientWins => (local.clone(), false),
            ConflictStrategy::ServerWins => (server.clone(), false),
            ConflictStrategy::LastWriteWins | ConflictStrategy::Merge(MergeFn::LastWriteWins) => {
                (last_write_wins(local, server).clone(), false)
            }
            ConflictStrategy::Manual => (server.clone(), true),
            ConflictStrategy::Merge(MergeFn::MatchResult) => {
                let outcome = merge_match(local, server, self.dispute.as_ref());
                (outcome.merged, outcome.disputed)
            }
        };
        resolved.local_id = local.local_id;

        debug!(
            table = %conflict.table,
            record_id = %conflict.record_id,
            %strategy,
            requires_user_action,
            "Conflict resolved"
        );

        Resolution {
            resolved,
            strategy,
            requires_user_action,
        }
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(StrategyMap::new(), Arc::new(ScoreSumExceeds::default()))
    }
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

/// Newer version wins; ties go to the server
fn last_write_wins<'a>(local: &'a SyncedEntity, server: &'a SyncedEntity) -> &'a SyncedEntity {
    if local.last_modified > server.server_timestamp_ms() {
        local
    } else {
        server
    }
}
