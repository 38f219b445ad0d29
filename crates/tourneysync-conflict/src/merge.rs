//! Field-level merge for match results
//!
//! Both players of a match may enter scores and confirm the result from
//! their own devices while offline. The merge keeps every confirmation,
//! keeps the most recent local score entry, and flags results that
//! cannot both be true.

use serde_json::{Map, Value};
use tracing::debug;

use tourneysync_core::domain::{now_millis, RecordStatus, SyncedEntity};

use crate::dispute::DisputePredicate;

pub const STATUS_FIELD: &str = "status";
pub const CONFIRMED_BY_P1_FIELD: &str = "confirmed_by_p1";
pub const CONFIRMED_BY_P2_FIELD: &str = "confirmed_by_p2";
pub const PLAYER1_SCORE_FIELD: &str = "player1_score";
pub const PLAYER2_SCORE_FIELD: &str = "player2_score";
pub const CONFIRMATION_STATUS_FIELD: &str = "confirmation_status";

/// Match statuses after which the server copy is authoritative
const FINAL_STATUSES: &[&str] = &["completed", "confirmed"];

/// Outcome of [`merge_match`]
#[derive(Debug, Clone, PartialEq)]
pub struct MatchMerge {
    pub merged: SyncedEntity,
    pub disputed: bool,
}

/// Merge two versions of a match record
///
/// The result keeps the local `local_id`, is `Synced` and is stamped
/// with the current time.
pub fn merge_match(
    local: &SyncedEntity,
    server: &SyncedEntity,
    dispute: &dyn DisputePredicate,
) -> MatchMerge {
    let mut merged = server.clone();
    merged.local_id = local.local_id;
    merged.sync_status = RecordStatus::Synced;
    merged.last_modified = now_millis();

    let finalized = server
        .field(STATUS_FIELD)
        .and_then(Value::as_str)
        .is_some_and(|status| FINAL_STATUSES.contains(&status));
    if finalized {
        debug!(local_id = %local.local_id, "Server match result is final, taking server copy");
        return MatchMerge {
            merged,
            disputed: false,
        };
    }

    let p1 = flag(local, CONFIRMED_BY_P1_FIELD) || flag(server, CONFIRMED_BY_P1_FIELD);
    let p2 = flag(local, CONFIRMED_BY_P2_FIELD) || flag(server, CONFIRMED_BY_P2_FIELD);
    merged
        .fields
        .insert(CONFIRMED_BY_P1_FIELD.to_string(), Value::Bool(p1));
    merged
        .fields
        .insert(CONFIRMED_BY_P2_FIELD.to_string(), Value::Bool(p2));

    for field in [PLAYER1_SCORE_FIELD, PLAYER2_SCORE_FIELD] {
        if let Some(scores) = merge_scores(local.field(field), server.field(field)) {
            merged.fields.insert(field.to_string(), scores);
        }
    }

    let confirmation = match (p1, p2) {
        (true, true) => "confirmed".to_string(),
        (true, false) | (false, true) => "partial".to_string(),
        (false, false) => server
            .field(CONFIRMATION_STATUS_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("pending")
            .to_string(),
    };
    merged.fields.insert(
        CONFIRMATION_STATUS_FIELD.to_string(),
        Value::String(confirmation),
    );

    let disputed = dispute.is_disputed(
        merged.field(PLAYER1_SCORE_FIELD).unwrap_or(&Value::Null),
        merged.field(PLAYER2_SCORE_FIELD).unwrap_or(&Value::Null),
    );
    if disputed {
        merged.fields.insert(
            CONFIRMATION_STATUS_FIELD.to_string(),
            Value::String("disputed".to_string()),
        );
    }

    MatchMerge { merged, disputed }
}

fn flag(entity: &SyncedEntity, field: &str) -> bool {
    entity
        .field(field)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn non_empty_map(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value
        .and_then(Value::as_object)
        .filter(|map| !map.is_empty())
}

/// Local non-null values win over the server's; a side without scores
/// contributes nothing. `None` leaves the server value in place.
fn merge_scores(local: Option<&Value>, server: Option<&Value>) -> Option<Value> {
    match (non_empty_map(local), non_empty_map(server)) {
        (Some(local), Some(server)) => {
            let mut merged = server.clone();
            for (key, value) in local {
                if !value.is_null() {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(Value::Object(merged))
        }
        (Some(local), None) => Some(Value::Object(local.clone())),
        (None, _) => None,
    }
}
