//! Credential store port
//!
//! Synchronous name/value storage for long-lived credentials, backed by a
//! cookie jar. Values are opaque; no validation is performed.

use chrono::{DateTime, Utc};
use pickup_domain::Cookie;

/// Errors that can occur while persisting credentials.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage for named credentials with an expiry.
///
/// `set` replaces any existing entry under the same name. `get` never
/// returns an expired entry. All operations are idempotent.
pub trait CredentialStore: Send + Sync {
    /// Stores `value` under `name` until `expires`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, name: &str, value: &str, expires: DateTime<Utc>) -> Result<(), StoreError>;

    /// Returns the live value stored under `name`.
    fn get(&self, name: &str) -> Option<String>;

    /// Removes `name`. Removing a missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// Domain and path every stored cookie is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieScope {
    /// Cookie domain.
    pub domain: String,
    /// Cookie path.
    pub path: String,
    /// Whether cookies are marked `Secure`.
    pub secure: bool,
}

impl CookieScope {
    /// Creates a scope.
    #[must_use]
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
            secure: true,
        }
    }

    /// Builds a cookie within this scope.
    #[must_use]
    pub fn cookie(&self, name: &str, value: &str, expires: DateTime<Utc>) -> Cookie {
        Cookie::new(name, value)
            .with_domain(self.domain.clone())
            .with_path(self.path.clone())
            .with_secure(self.secure)
            .with_expires(expires)
    }
}

impl Default for CookieScope {
    fn default() -> Self {
        Self::new("localhost", "/")
    }
}
