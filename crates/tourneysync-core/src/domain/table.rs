//! Syncable entity tables
//!
//! The engine replicates a fixed set of server tables. Keeping them in an
//! enum lets every per-table policy be an exhaustive `match`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// A server-side table mirrored in the local replica
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Users,
    Tournaments,
    Registrations,
    Rounds,
    Matches,
}

impl EntityTable {
    /// All syncable tables, in the default pull order
    pub const ALL: [EntityTable; 5] = [
        EntityTable::Users,
        EntityTable::Tournaments,
        EntityTable::Registrations,
        EntityTable::Rounds,
        EntityTable::Matches,
    ];

    /// Name of the table on the remote store and in the local replica
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityTable::Users => "users",
            EntityTable::Tournaments => "tournaments",
            EntityTable::Registrations => "registrations",
            EntityTable::Rounds => "rounds",
            EntityTable::Matches => "matches",
        }
    }
}

impl Display for EntityTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityTable {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(EntityTable::Users),
            "tournaments" => Ok(EntityTable::Tournaments),
            "registrations" => Ok(EntityTable::Registrations),
            "rounds" => Ok(EntityTable::Rounds),
            "matches" => Ok(EntityTable::Matches),
            other => Err(DomainError::UnknownTable(other.to_string())),
        }
    }
}
