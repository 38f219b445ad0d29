//! Domain newtypes
//!
//! Strongly-typed wrappers for the three identifier spaces the engine
//! juggles: local replica ids, change queue sequence numbers, and
//! server-assigned record ids.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;

// ============================================================================
// Local identifiers
// ============================================================================

/// Locally-assigned record identifier
///
/// Assigned by the replica store on insert, monotonically increasing, and
/// stable for the lifetime of the local record regardless of whether the
/// server has assigned an id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(i64);

impl LocalId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl Display for LocalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid local id '{s}': {e}")))
    }
}

impl From<i64> for LocalId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Change queue sequence number
///
/// Assigned by the queue on enqueue; drives FIFO ordering and dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueEntryId(i64);

impl QueueEntryId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl Display for QueueEntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for QueueEntryId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

// ============================================================================
// Server identifiers
// ============================================================================

/// Server-assigned record id
///
/// Opaque to the engine. The remote store may hand out UUID strings or
/// integer keys; both are normalized to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerId(String);

impl ServerId {
    /// Create a new ServerId
    ///
    /// # Errors
    /// Returns error if the id is empty
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidId(
                "Server id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Extract a server id from a JSON value (string or integer)
    ///
    /// Returns `None` for null, empty strings, and any other JSON type.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s.clone()).ok(),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self(n.to_string())),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON representation used when writing the id back into a payload
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl Display for ServerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ServerId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ServerId> for String {
    fn from(id: ServerId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod local_id_tests {
        use super::*;

        #[test]
        fn test_ordering_follows_value() {
            assert!(LocalId::new(1) < LocalId::new(2));
        }

        #[test]
        fn test_from_str() {
            let id: LocalId = "42".parse().unwrap();
            assert_eq!(id.value(), 42);
            assert!("abc".parse::<LocalId>().is_err());
        }

        #[test]
        fn test_serde_is_transparent() {
            let json = serde_json::to_string(&LocalId::new(9)).unwrap();
            assert_eq!(json, "9");
        }
    }

    mod server_id_tests {
        use super::*;

        #[test]
        fn test_rejects_empty() {
            assert!(ServerId::new("").is_err());
            assert!(ServerId::new("   ").is_err());
        }

        #[test]
        fn test_from_json_string_and_number() {
            assert_eq!(
                ServerId::from_json(&json!("a1b2")).unwrap().as_str(),
                "a1b2"
            );
            assert_eq!(ServerId::from_json(&json!(17)).unwrap().as_str(), "17");
        }

        #[test]
        fn test_from_json_rejects_other_types() {
            assert!(ServerId::from_json(&Value::Null).is_none());
            assert!(ServerId::from_json(&json!("")).is_none());
            assert!(ServerId::from_json(&json!(1.5)).is_none());
            assert!(ServerId::from_json(&json!({"id": 1})).is_none());
        }

        #[test]
        fn test_deserialize_validates() {
            let ok: Result<ServerId, _> = serde_json::from_str("\"srv-1\"");
            assert!(ok.is_ok());
            let bad: Result<ServerId, _> = serde_json::from_str("\"\"");
            assert!(bad.is_err());
        }
    }
}
