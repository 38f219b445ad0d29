//! Shared wiremock helpers for remote store integration tests

use serde_json::Value;
use wiremock::MockServer;

use tourneysync_core::domain::RecordFields;
use tourneysync_remote::{RestClient, RestRemoteStore};

pub const TEST_KEY: &str = "anon-test-key";

/// Starts a mock server and a store pointed at it
pub async fn setup_store() -> (MockServer, RestRemoteStore) {
    let server = MockServer::start().await;
    let client = RestClient::new(server.uri(), Some(TEST_KEY.to_string()));
    (server, RestRemoteStore::new(client))
}

/// Converts a JSON object literal into record fields
pub fn row(value: Value) -> RecordFields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}
