//! Conflict strategy names as written in configuration

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use super::errors::DomainError;

/// A conflict strategy name, independent of the table it applies to
///
/// Configuration uses the kebab-case spelling; snake_case is accepted
/// as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyName {
    ClientWins,
    ServerWins,
    LastWriteWins,
    Manual,
    Merge,
}

impl StrategyName {
    pub const ALL: [StrategyName; 5] = [
        StrategyName::ClientWins,
        StrategyName::ServerWins,
        StrategyName::LastWriteWins,
        StrategyName::Manual,
        StrategyName::Merge,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            StrategyName::ClientWins => "client-wins",
            StrategyName::ServerWins => "server-wins",
            StrategyName::LastWriteWins => "last-write-wins",
            StrategyName::Manual => "manual",
            StrategyName::Merge => "merge",
        }
    }

    /// Comma-separated list of the canonical names
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(StrategyName::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for StrategyName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client-wins" | "client_wins" => Ok(StrategyName::ClientWins),
            "server-wins" | "server_wins" => Ok(StrategyName::ServerWins),
            "last-write-wins" | "last_write_wins" => Ok(StrategyName::LastWriteWins),
            "manual" => Ok(StrategyName::Manual),
            "merge" => Ok(StrategyName::Merge),
            other => Err(DomainError::UnknownStrategy(other.to_string())),
        }
    }
}
