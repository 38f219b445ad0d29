//! TourneySync Remote - REST adapter for the authoritative store
//!
//! Provides:
//! - An HTTP client for a PostgREST-style table API
//! - [`RestRemoteStore`], the remote-store port implementation
//! - A reachability probe for connectivity detection
//!
//! ## Modules
//!
//! - [`client`] - Authenticated request building and status mapping
//! - [`provider`] - `IRemoteStore` implementation

pub mod client;
pub mod provider;

pub use client::RestClient;
pub use provider::RestRemoteStore;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the remote store
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Credentials missing or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Row-level policy refused the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Table or route does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique or foreign key violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response body could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Maps a non-success status and its body to an error
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(body),
            StatusCode::FORBIDDEN => RemoteError::Forbidden(body),
            StatusCode::NOT_FOUND => RemoteError::NotFound(body),
            StatusCode::CONFLICT => RemoteError::Conflict(body),
            s if s.is_server_error() => RemoteError::ServerError {
                status: s.as_u16(),
                body,
            },
            s => RemoteError::Status {
                status: s.as_u16(),
                body,
            },
        }
    }

    /// Whether retrying later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::ServerError { .. } | RemoteError::NetworkError(_)
        )
    }
}
