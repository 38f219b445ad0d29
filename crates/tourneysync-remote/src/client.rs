//! HTTP client for a PostgREST-style table API
//!
//! Every table is exposed under `{base_url}/rest/v1/{table}`. Requests
//! carry the project key both as the `apikey` header and as a bearer
//! token.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use tourneysync_core::config::RemoteConfig;
use tourneysync_core::domain::EntityTable;

use crate::RemoteError;

/// Path prefix of the table API
const REST_PREFIX: &str = "/rest/v1";

/// Authenticated HTTP client for the remote store
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestClient {
    /// Creates a client with default reqwest settings
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    /// Creates a client whose requests time out after `timeout`
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Creates a client from the `remote` configuration section
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        Self::with_timeout(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    /// Builds an authenticated request against a table
    pub fn table_request(&self, method: Method, table: EntityTable) -> RequestBuilder {
        let url = format!("{}{}/{}", self.base_url, REST_PREFIX, table);
        self.authorize(self.client.request(method, url))
    }

    /// Sends a request and maps non-success statuses to [`RemoteError`]
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %body, "Remote returned error status");
        Err(RemoteError::from_status(status, body))
    }

    /// Whether the remote store answers at all
    ///
    /// Any response below 500 counts as reachable; an auth error still
    /// proves the network path works.
    pub async fn probe(&self) -> bool {
        let url = format!("{}{}/", self.base_url, REST_PREFIX);
        match self.authorize(self.client.get(url)).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(err) => {
                debug!(error = %err, "Remote probe failed");
                false
            }
        }
    }
}
