//! CRUD requests against the table API

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use tourneysync_core::domain::{EntityTable, ServerId};
use tourneysync_core::ports::IRemoteStore;

use crate::common::{row, setup_store, TEST_KEY};

#[tokio::test]
async fn test_select_returns_rows() {
    let (server, store) = setup_store().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tournaments"))
        .and(query_param("select", "*"))
        .and(header("apikey", TEST_KEY))
        .and(header("authorization", format!("Bearer {TEST_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t-1", "name": "Spring Open", "updated_at": "2024-05-01T10:00:00Z"},
            {"id": "t-2", "name": "Summer Cup", "updated_at": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = store.select(EntityTable::Tournaments).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], json!("Spring Open"));
    assert_eq!(rows[1]["id"], json!("t-2"));
}

#[tokio::test]
async fn test_select_empty_table() {
    let (server, store) = setup_store().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/rounds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(store.select(EntityTable::Rounds).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_insert_returns_echoed_row() {
    let (server, store) = setup_store().await;
    let payload = row(json!({"nick": "kim", "status": "pending"}));
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({"nick": "kim", "status": "pending"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": 42, "nick": "kim", "updated_at": "2024-05-01T10:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let echoed = store
        .insert(EntityTable::Users, &payload)
        .await
        .unwrap()
        .expect("row echoed");
    assert_eq!(ServerId::from_json(&echoed["id"]).unwrap().as_str(), "42");
    assert_eq!(echoed["updated_at"], json!("2024-05-01T10:00:00Z"));
}

#[tokio::test]
async fn test_insert_without_representation() {
    let (server, store) = setup_store().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/registrations"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let echoed = store
        .insert(EntityTable::Registrations, &row(json!({"user_id": "u-1"})))
        .await
        .unwrap();
    assert!(echoed.is_none());
}

#[tokio::test]
async fn test_update_filters_by_id() {
    let (server, store) = setup_store().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/matches"))
        .and(query_param("id", "eq.m-7"))
        .and(body_json(json!({"id": "m-7", "round": 2})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let id = ServerId::new("m-7").unwrap();
    store
        .update(EntityTable::Matches, &id, &row(json!({"id": "m-7", "round": 2})))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_filters_by_id() {
    let (server, store) = setup_store().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/tournaments"))
        .and(query_param("id", "eq.t-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let id = ServerId::new("t-9").unwrap();
    store.delete(EntityTable::Tournaments, &id).await.unwrap();
}
