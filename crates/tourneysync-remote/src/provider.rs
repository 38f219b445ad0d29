//! RestRemoteStore - IRemoteStore implementation over the REST table API
//!
//! - `select`: `GET /rest/v1/{table}?select=*`
//! - `insert`: `POST /rest/v1/{table}` with `Prefer: return=representation`
//! - `update`: `PATCH /rest/v1/{table}?id=eq.{id}`
//! - `delete`: `DELETE /rest/v1/{table}?id=eq.{id}`

use anyhow::{Context, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use tourneysync_core::config::RemoteConfig;
use tourneysync_core::domain::{EntityTable, RecordFields, ServerId};
use tourneysync_core::ports::{IRemoteStore, RemoteRecord};

use crate::client::RestClient;
use crate::RemoteError;

/// Remote store adapter backed by [`RestClient`]
#[derive(Debug, Clone)]
pub struct RestRemoteStore {
    client: RestClient,
}

impl RestRemoteStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        Ok(Self::new(RestClient::from_config(config)?))
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// Whether the remote store is reachable
    pub async fn probe(&self) -> bool {
        self.client.probe().await
    }
}

fn id_filter(id: &ServerId) -> [(&'static str, String); 1] {
    [("id", format!("eq.{id}"))]
}

/// Extracts the echoed row from a `return=representation` body
///
/// The body is normally a one-element array; an empty body or array
/// means the store did not echo the row.
fn echoed_row(body: &[u8]) -> Result<Option<RemoteRecord>, RemoteError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
    match value {
        Value::Array(rows) => match rows.into_iter().next() {
            Some(Value::Object(row)) => Ok(Some(row)),
            Some(other) => Err(RemoteError::InvalidResponse(format!(
                "expected object row, got {other}"
            ))),
            None => Ok(None),
        },
        Value::Object(row) => Ok(Some(row)),
        other => Err(RemoteError::InvalidResponse(format!(
            "expected row array, got {other}"
        ))),
    }
}

#[async_trait::async_trait]
impl IRemoteStore for RestRemoteStore {
    async fn select(&self, table: EntityTable) -> Result<Vec<RemoteRecord>> {
        let request = self
            .client
            .table_request(Method::GET, table)
            .query(&[("select", "*")]);
        let rows: Vec<RemoteRecord> = self
            .client
            .send(request)
            .await
            .with_context(|| format!("GET {table} failed"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {table} rows"))?;

        debug!(%table, count = rows.len(), "Selected remote rows");
        Ok(rows)
    }

    async fn insert(&self, table: EntityTable, payload: &RecordFields) -> Result<Option<RemoteRecord>> {
        let request = self
            .client
            .table_request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(payload);
        let body = self
            .client
            .send(request)
            .await
            .with_context(|| format!("POST {table} failed"))?
            .bytes()
            .await
            .with_context(|| format!("Failed to read {table} insert response"))?;

        let row = echoed_row(&body)?;
        debug!(%table, echoed = row.is_some(), "Inserted remote row");
        Ok(row)
    }

    async fn update(&self, table: EntityTable, id: &ServerId, payload: &RecordFields) -> Result<()> {
        let request = self
            .client
            .table_request(Method::PATCH, table)
            .query(&id_filter(id))
            .json(payload);
        self.client
            .send(request)
            .await
            .with_context(|| format!("PATCH {table}/{id} failed"))?;

        debug!(%table, %id, "Updated remote row");
        Ok(())
    }

    async fn delete(&self, table: EntityTable, id: &ServerId) -> Result<()> {
        let request = self
            .client
            .table_request(Method::DELETE, table)
            .query(&id_filter(id));
        self.client
            .send(request)
            .await
            .with_context(|| format!("DELETE {table}/{id} failed"))?;

        debug!(%table, %id, "Deleted remote row");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echoed_row_shapes() {
        assert_eq!(echoed_row(b"").unwrap(), None);
        assert_eq!(echoed_row(b"[]").unwrap(), None);

        let row = echoed_row(br#"[{"id": 5, "name": "x"}]"#).unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&Value::from(5)));

        let row = echoed_row(br#"{"id": "a"}"#).unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&Value::from("a")));

        assert!(echoed_row(b"42").is_err());
        assert!(echoed_row(b"not json").is_err());
    }

    #[test]
    fn test_id_filter() {
        let id = ServerId::new("m-1").unwrap();
        assert_eq!(id_filter(&id), [("id", "eq.m-1".to_string())]);
    }
}
