//! Reachability probe

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tourneysync_remote::{RestClient, RestRemoteStore};

async fn store_for(server: &MockServer) -> RestRemoteStore {
    RestRemoteStore::new(RestClient::new(format!("{}/", server.uri()), None))
}

#[tokio::test]
async fn test_probe_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(store_for(&server).await.probe().await);
}

#[tokio::test]
async fn test_probe_auth_error_still_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(store_for(&server).await.probe().await);
}

#[tokio::test]
async fn test_probe_server_error_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    assert!(!store_for(&server).await.probe().await);
}

#[tokio::test]
async fn test_probe_trims_trailing_slash() {
    let server = MockServer::start().await;
    let store = store_for(&server).await;
    assert_eq!(store.client().base_url(), server.uri());
}
