//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A phone number does not match the accepted mobile format.
    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    /// A token value is empty or otherwise unusable.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A request path is not absolute.
    #[error("invalid request path: {0}")]
    InvalidPath(String),

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Query parameters could not be encoded.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
