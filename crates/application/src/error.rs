//! Application error types

use pickup_domain::DomainError;
use thiserror::Error;

use crate::ports::{StoreError, TransportError};

/// Errors surfaced by the authenticated gateway and the use cases built on it.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A 401 arrived and no refresh credential was stored.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The refresh endpoint rejected the credential, or the session ended
    /// while this request was waiting for another refresh.
    #[error("token refresh denied: {message}")]
    RefreshDenied {
        /// Status returned by the refresh endpoint, if one was reached.
        status: Option<u16>,
        /// Description for logs.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status.
        status: u16,
        /// Response body as text.
        body: String,
    },

    /// No response was received.
    #[error("network failure: {0}")]
    Transport(#[from] TransportError),

    /// Caller-supplied input was rejected before sending.
    #[error("validation failed: {0}")]
    Validation(#[from] DomainError),

    /// A success response did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The credential store could not be written.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification of [`GatewayError`] for user-facing handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unauthorized after the one permitted refresh.
    AuthExpired,
    /// The refresh endpoint rejected the credential.
    RefreshDenied,
    /// No refresh credential was available.
    NoRefreshToken,
    /// Transport-level failure.
    NetworkFailure,
    /// Malformed caller input.
    ValidationFailure,
    /// Any other HTTP error status.
    Http,
    /// Malformed server response or local storage failure.
    Internal,
}

impl GatewayError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoRefreshToken => ErrorKind::NoRefreshToken,
            Self::RefreshDenied { .. } => ErrorKind::RefreshDenied,
            Self::Status { status: 401, .. } => ErrorKind::AuthExpired,
            Self::Status { .. } => ErrorKind::Http,
            Self::Transport(_) => ErrorKind::NetworkFailure,
            Self::Validation(_) => ErrorKind::ValidationFailure,
            Self::Decode(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the user has to log in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NoRefreshToken | ErrorKind::RefreshDenied
        )
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
