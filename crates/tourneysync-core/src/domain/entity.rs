//! Synced entity records
//!
//! A [`SyncedEntity`] is one business record (a tournament, registration,
//! round, match, or user) as held in the local replica: the server columns
//! as a JSON object plus local-only bookkeeping.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;
use super::newtypes::{LocalId, ServerId};

/// Server columns of a record, keyed by column name
pub type RecordFields = serde_json::Map<String, Value>;

/// Column that carries the server-assigned id on remote records
pub const ID_FIELD: &str = "id";

/// Current wall-clock time in milliseconds since the Unix epoch
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a server timestamp column
///
/// Accepts RFC 3339 strings, Postgres-style `YYYY-MM-DD HH:MM:SS[.f]+TZ`
/// strings, and integer epoch milliseconds. Anything else yields `None`.
#[must_use]
pub fn parse_server_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z"))
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

// ============================================================================
// RecordStatus
// ============================================================================

/// Per-record synchronization status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Local copy matches the last known server version
    Synced,
    /// Local edit not yet acknowledged by the server
    Pending,
    /// A conflict was resolved provisionally and needs a human decision
    Conflict,
    /// The last push of this record failed permanently
    Error,
}

impl RecordStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Synced => "synced",
            RecordStatus::Pending => "pending",
            RecordStatus::Conflict => "conflict",
            RecordStatus::Error => "error",
        }
    }
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synced" => Ok(RecordStatus::Synced),
            "pending" => Ok(RecordStatus::Pending),
            "conflict" => Ok(RecordStatus::Conflict),
            "error" => Ok(RecordStatus::Error),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

// ============================================================================
// SyncedEntity
// ============================================================================

/// A record in the local replica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedEntity {
    /// Server-assigned id; `None` until the server accepted the insert
    pub id: Option<ServerId>,
    #[serde(rename = "_localId")]
    pub local_id: LocalId,
    #[serde(rename = "_syncStatus")]
    pub sync_status: RecordStatus,
    /// Local wall-clock time (ms) of the most recent local mutation
    #[serde(rename = "_lastModified")]
    pub last_modified: i64,
    /// Last timestamp observed from the server for this record
    #[serde(
        rename = "_serverTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server_timestamp: Option<DateTime<Utc>>,
    /// Server columns, excluding `id`
    #[serde(flatten)]
    pub fields: RecordFields,
}

impl SyncedEntity {
    /// Build the local view of a record fetched from the remote store
    ///
    /// The `id` column is lifted into [`SyncedEntity::id`], the server
    /// timestamp is read from `timestamp_field`, and underscore-prefixed
    /// bookkeeping keys are dropped. The result is `Synced` with
    /// `last_modified = 0`; callers stamp the local time they need.
    #[must_use]
    pub fn from_remote(record: &RecordFields, local_id: LocalId, timestamp_field: &str) -> Self {
        let id = record.get(ID_FIELD).and_then(ServerId::from_json);
        let server_timestamp = record.get(timestamp_field).and_then(parse_server_timestamp);
        let fields = record
            .iter()
            .filter(|(k, _)| k.as_str() != ID_FIELD && !k.starts_with('_'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            id,
            local_id,
            sync_status: RecordStatus::Synced,
            last_modified: 0,
            server_timestamp,
            fields,
        }
    }

    /// Server timestamp in epoch milliseconds, or 0 when none was observed
    #[must_use]
    pub fn server_timestamp_ms(&self) -> i64 {
        self.server_timestamp
            .map(|ts| ts.timestamp_millis())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.sync_status == RecordStatus::Synced
    }

    /// Field values to send to the remote store, including `id` when known
    #[must_use]
    pub fn to_payload(&self) -> RecordFields {
        let mut payload = self.fields.clone();
        if let Some(id) = &self.id {
            payload.insert(ID_FIELD.to_string(), id.to_json());
        }
        payload
    }
}

// ============================================================================
// NewEntity
// ============================================================================

/// A record about to be inserted into the replica (no local id yet)
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub id: Option<ServerId>,
    pub sync_status: RecordStatus,
    pub last_modified: i64,
    pub server_timestamp: Option<DateTime<Utc>>,
    pub fields: RecordFields,
}

impl NewEntity {
    /// A locally created record awaiting its first push
    #[must_use]
    pub fn pending(fields: RecordFields, last_modified: i64) -> Self {
        Self {
            id: None,
            sync_status: RecordStatus::Pending,
            last_modified,
            server_timestamp: None,
            fields,
        }
    }

    /// Attach the local id assigned by the store
    #[must_use]
    pub fn into_entity(self, local_id: LocalId) -> SyncedEntity {
        SyncedEntity {
            id: self.id,
            local_id,
            sync_status: self.sync_status,
            last_modified: self.last_modified,
            server_timestamp: self.server_timestamp,
            fields: self.fields,
        }
    }
}

impl From<SyncedEntity> for NewEntity {
    fn from(entity: SyncedEntity) -> Self {
        Self {
            id: entity.id,
            sync_status: entity.sync_status,
            last_modified: entity.last_modified,
            server_timestamp: entity.server_timestamp,
            fields: entity.fields,
        }
    }
}

// ============================================================================
// EntityPatch
// ============================================================================

/// Partial update of a replica record
///
/// Unset options leave the stored value alone; `fields` are merged over
/// the stored columns key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    pub id: Option<ServerId>,
    pub sync_status: Option<RecordStatus>,
    pub last_modified: Option<i64>,
    pub server_timestamp: Option<DateTime<Utc>>,
    pub fields: RecordFields,
}

impl EntityPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: ServerId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.sync_status = Some(status);
        self
    }

    #[must_use]
    pub fn with_last_modified(mut self, millis: i64) -> Self {
        self.last_modified = Some(millis);
        self
    }

    #[must_use]
    pub fn with_server_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.server_timestamp = Some(ts);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: RecordFields) -> Self {
        self.fields = fields;
        self
    }

    /// Apply this patch to a record in place
    ///
    /// # Errors
    /// Returns `DomainError::InvalidId` if the patch would change a server id
    /// that is already assigned.
    pub fn apply_to(&self, entity: &mut SyncedEntity) -> Result<(), DomainError> {
        if let Some(id) = &self.id {
            match &entity.id {
                Some(existing) if existing != id => {
                    return Err(DomainError::InvalidId(format!(
                        "record {} already has server id {existing}, refusing {id}",
                        entity.local_id
                    )));
                }
                _ => entity.id = Some(id.clone()),
            }
        }
        if let Some(status) = self.sync_status {
            entity.sync_status = status;
        }
        if let Some(millis) = self.last_modified {
            entity.last_modified = millis;
        }
        if let Some(ts) = self.server_timestamp {
            entity.server_timestamp = Some(ts);
        }
        for (key, value) in &self.fields {
            if key == ID_FIELD {
                continue;
            }
            entity.fields.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> RecordFields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_remote_lifts_id_and_timestamp() {
        let record = fields(json!({
            "id": "m-1",
            "status": "in_progress",
            "updated_at": "2026-03-01T12:00:00Z",
            "_localId": 99
        }));

        let entity = SyncedEntity::from_remote(&record, LocalId::new(4), "updated_at");

        assert_eq!(entity.id.as_ref().unwrap().as_str(), "m-1");
        assert_eq!(entity.local_id, LocalId::new(4));
        assert_eq!(entity.sync_status, RecordStatus::Synced);
        assert_eq!(
            entity.server_timestamp_ms(),
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
                .unwrap()
                .timestamp_millis()
        );
        assert!(entity.field("id").is_none());
        assert!(entity.field("_localId").is_none());
        assert_eq!(entity.field("status"), Some(&json!("in_progress")));
    }

    #[test]
    fn test_server_timestamp_ms_defaults_to_zero() {
        let entity = SyncedEntity::from_remote(&fields(json!({"id": 1})), LocalId::new(1), "updated_at");
        assert_eq!(entity.server_timestamp_ms(), 0);
    }

    #[test]
    fn test_parse_server_timestamp_formats() {
        assert!(parse_server_timestamp(&json!("2026-03-01T12:00:00.123456+00:00")).is_some());
        assert!(parse_server_timestamp(&json!("2026-03-01 12:00:00.5+00")).is_some());
        assert_eq!(
            parse_server_timestamp(&json!(1_700_000_000_000_i64))
                .unwrap()
                .timestamp_millis(),
            1_700_000_000_000
        );
        assert!(parse_server_timestamp(&json!("yesterday")).is_none());
        assert!(parse_server_timestamp(&Value::Null).is_none());
    }

    #[test]
    fn test_serde_uses_bookkeeping_names() {
        let entity = NewEntity::pending(fields(json!({"name": "Spring Open"})), 1000)
            .into_entity(LocalId::new(3));
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["_localId"], json!(3));
        assert_eq!(json["_syncStatus"], json!("pending"));
        assert_eq!(json["_lastModified"], json!(1000));
        assert_eq!(json["name"], json!("Spring Open"));
        assert!(json.get("_serverTimestamp").is_none());
    }

    #[test]
    fn test_to_payload_includes_known_id() {
        let mut entity = NewEntity::pending(fields(json!({"name": "A"})), 0)
            .into_entity(LocalId::new(1));
        assert!(entity.to_payload().get("id").is_none());

        entity.id = Some(ServerId::new("srv-9").unwrap());
        assert_eq!(entity.to_payload()["id"], json!("srv-9"));
    }

    #[test]
    fn test_patch_merges_fields_and_bookkeeping() {
        let mut entity = NewEntity::pending(fields(json!({"name": "A", "size": 8})), 10)
            .into_entity(LocalId::new(1));

        EntityPatch::new()
            .with_id(ServerId::new("t-1").unwrap())
            .with_status(RecordStatus::Synced)
            .with_fields(fields(json!({"size": 16, "id": "ignored"})))
            .apply_to(&mut entity)
            .unwrap();

        assert_eq!(entity.id.as_ref().unwrap().as_str(), "t-1");
        assert_eq!(entity.sync_status, RecordStatus::Synced);
        assert_eq!(entity.last_modified, 10);
        assert_eq!(entity.field("name"), Some(&json!("A")));
        assert_eq!(entity.field("size"), Some(&json!(16)));
        assert!(entity.field("id").is_none());
    }

    #[test]
    fn test_patch_refuses_to_change_assigned_id() {
        let mut entity = NewEntity::pending(RecordFields::new(), 0).into_entity(LocalId::new(1));
        entity.id = Some(ServerId::new("first").unwrap());

        let same = EntityPatch::new().with_id(ServerId::new("first").unwrap());
        assert!(same.apply_to(&mut entity).is_ok());

        let other = EntityPatch::new().with_id(ServerId::new("second").unwrap());
        assert!(other.apply_to(&mut entity).is_err());
        assert_eq!(entity.id.as_ref().unwrap().as_str(), "first");
    }

    #[test]
    fn test_record_status_round_trip_strings() {
        for status in [
            RecordStatus::Synced,
            RecordStatus::Pending,
            RecordStatus::Conflict,
            RecordStatus::Error,
        ] {
            assert_eq!(status.to_string().parse::<RecordStatus>().unwrap(), status);
        }
        assert!("stale".parse::<RecordStatus>().is_err());
    }
}
