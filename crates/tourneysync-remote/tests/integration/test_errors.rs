//! Error mapping for non-success responses

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use tourneysync_core::domain::{EntityTable, ServerId};
use tourneysync_core::ports::IRemoteStore;
use tourneysync_remote::{RemoteError, RestClient, RestRemoteStore};

use crate::common::{row, setup_store};

fn remote_error(err: &anyhow::Error) -> &RemoteError {
    err.downcast_ref::<RemoteError>()
        .expect("error chain carries RemoteError")
}

#[tokio::test]
async fn test_insert_conflict_maps_to_conflict() {
    let (server, store) = setup_store().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string(r#"{"message":"duplicate key"}"#),
        )
        .mount(&server)
        .await;

    let err = store
        .insert(EntityTable::Users, &row(json!({"nick": "kim"})))
        .await
        .unwrap_err();
    match remote_error(&err) {
        RemoteError::Conflict(body) => assert!(body.contains("duplicate key")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, store) = setup_store().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/matches"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = store.select(EntityTable::Matches).await.unwrap_err();
    let remote = remote_error(&err);
    assert!(matches!(remote, RemoteError::ServerError { status: 503, .. }));
    assert!(remote.is_transient());
}

#[tokio::test]
async fn test_unauthorized_update() {
    let (server, store) = setup_store().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/rounds"))
        .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
        .mount(&server)
        .await;

    let id = ServerId::new("r-1").unwrap();
    let err = store
        .update(EntityTable::Rounds, &id, &row(json!({"number": 1})))
        .await
        .unwrap_err();
    assert!(matches!(remote_error(&err), RemoteError::Unauthorized(_)));
}

#[tokio::test]
async fn test_malformed_select_body() {
    let (server, store) = setup_store().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    assert!(store.select(EntityTable::Users).await.is_err());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let store = RestRemoteStore::new(RestClient::new("http://127.0.0.1:1", None));
    let err = store.select(EntityTable::Users).await.unwrap_err();
    assert!(matches!(remote_error(&err), RemoteError::NetworkError(_)));
}
