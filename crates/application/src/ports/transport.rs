//! API transport port

use async_trait::async_trait;
use pickup_domain::{AccessToken, ApiRequest, ApiResponse};

/// Transport-level failures. HTTP error statuses are not errors here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete in time.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The target URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be encoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Port for sending API requests.
///
/// Implementations resolve `request.path` against the API base URL and
/// attach `Authorization: Bearer <token>` when `access_token` is given.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Sends one request and returns whatever response arrived.
    ///
    /// # Errors
    ///
    /// Returns an error only when no HTTP response was received.
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError>;
}
