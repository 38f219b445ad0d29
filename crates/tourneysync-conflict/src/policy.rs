//! Per-table conflict strategies
//!
//! Every syncable table has a default strategy, chosen by an exhaustive
//! `match` so that adding a table forces a policy decision. Configuration
//! may override the default per table.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use tourneysync_core::domain::{EntityTable, StrategyName};

use crate::error::ConflictError;

/// Merge function applied by [`ConflictStrategy::Merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeFn {
    /// No field-level merge: newest write wins
    LastWriteWins,
    /// Match results: OR confirmations, merge scores, detect disputes
    MatchResult,
}

impl MergeFn {
    /// Merge function used when `merge` is configured for a table
    pub fn for_table(table: EntityTable) -> Self {
        match table {
            EntityTable::Matches => MergeFn::MatchResult,
            EntityTable::Users
            | EntityTable::Tournaments
            | EntityTable::Registrations
            | EntityTable::Rounds => MergeFn::LastWriteWins,
        }
    }
}

/// How a (local, server) conflict is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// Keep the local version
    ClientWins,
    /// Take the server version
    ServerWins,
    /// Newer of local edit time and server timestamp; ties go to the server
    LastWriteWins,
    /// Take the server version provisionally and ask a human
    Manual,
    /// Table-specific merge
    Merge(MergeFn),
}

impl ConflictStrategy {
    /// Configuration name of the strategy
    pub fn name(&self) -> &'static str {
        match self {
            ConflictStrategy::ClientWins => "client-wins",
            ConflictStrategy::ServerWins => "server-wins",
            ConflictStrategy::LastWriteWins => "last-write-wins",
            ConflictStrategy::Manual => "manual",
            ConflictStrategy::Merge(_) => "merge",
        }
    }
}

impl Display for ConflictStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a strategy name for a given table
///
/// Accepts the kebab-case names used in configuration and their
/// snake_case spellings. `merge` binds the table's merge function.
pub fn parse_strategy(s: &str, table: EntityTable) -> Option<ConflictStrategy> {
    let name = StrategyName::from_str(s).ok()?;
    Some(match name {
        StrategyName::ClientWins => ConflictStrategy::ClientWins,
        StrategyName::ServerWins => ConflictStrategy::ServerWins,
        StrategyName::LastWriteWins => ConflictStrategy::LastWriteWins,
        StrategyName::Manual => ConflictStrategy::Manual,
        StrategyName::Merge => ConflictStrategy::Merge(MergeFn::for_table(table)),
    })
}

/// Built-in strategy for a table
pub fn default_strategy(table: EntityTable) -> ConflictStrategy {
    match table {
        EntityTable::Users => ConflictStrategy::ServerWins,
        EntityTable::Tournaments => ConflictStrategy::LastWriteWins,
        EntityTable::Registrations => ConflictStrategy::LastWriteWins,
        EntityTable::Rounds => ConflictStrategy::ServerWins,
        EntityTable::Matches => ConflictStrategy::Merge(MergeFn::MatchResult),
    }
}

/// Strategy lookup with optional per-table overrides
#[derive(Debug, Clone, Default)]
pub struct StrategyMap {
    overrides: HashMap<EntityTable, ConflictStrategy>,
}

impl StrategyMap {
    /// Map with only the built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from configuration overrides (`table -> strategy name`)
    ///
    /// Unknown tables and strategies are logged and skipped.
    pub fn from_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut map = Self::new();
        for (table_name, strategy_name) in overrides {
            let Ok(table) = EntityTable::from_str(table_name) else {
                warn!(table = %table_name, "Skipping strategy override for unknown table");
                continue;
            };
            match parse_strategy(strategy_name, table) {
                Some(strategy) => {
                    map.overrides.insert(table, strategy);
                }
                None => {
                    warn!(
                        %table,
                        strategy = %strategy_name,
                        "Skipping invalid conflict strategy override"
                    );
                }
            }
        }

        debug!(
            overrides_count = map.overrides.len(),
            "StrategyMap initialized"
        );
        map
    }

    /// Builds a map from configuration overrides, rejecting bad entries
    pub fn try_from_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, ConflictError> {
        let mut map = Self::new();
        for (table_name, strategy_name) in overrides {
            let table = EntityTable::from_str(table_name)
                .map_err(|_| ConflictError::UnknownTable(table_name.clone()))?;
            let strategy = parse_strategy(strategy_name, table).ok_or_else(|| {
                ConflictError::InvalidStrategy {
                    table: table_name.clone(),
                    strategy: strategy_name.clone(),
                }
            })?;
            map.overrides.insert(table, strategy);
        }
        Ok(map)
    }

    /// Overrides the strategy of one table
    pub fn with_override(mut self, table: EntityTable, strategy: ConflictStrategy) -> Self {
        self.overrides.insert(table, strategy);
        self
    }

    /// Strategy in effect for a table
    pub fn strategy_for(&self, table: EntityTable) -> ConflictStrategy {
        self.overrides
            .get(&table)
            .copied()
            .unwrap_or_else(|| default_strategy(table))
    }

    /// Returns the number of configured overrides
    pub fn overrides_count(&self) -> usize {
        self.overrides.len()
    }
}
