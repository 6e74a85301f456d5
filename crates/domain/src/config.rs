//! Client configuration.
//!
//! Every field has a default so a partial file or a handful of
//! environment overrides is enough to start a client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};

/// How the refresh credential is presented to the refresh endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// `{ "refreshToken": "..." }` in the JSON body.
    #[default]
    Body,
    /// Empty body; the credential travels in the `Cookie` header.
    Cookie,
}

/// Realtime channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// Reconnect after the connection drops.
    pub auto_reconnect: bool,
    /// First reconnect delay in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Upper bound for the reconnect delay in milliseconds.
    pub max_reconnect_delay_ms: u64,
    /// Maximum consecutive failed attempts (0 for unlimited).
    pub max_reconnect_attempts: u32,
    /// Handshake timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 5_000,
            max_reconnect_attempts: 0,
            connect_timeout_secs: 20,
        }
    }
}

impl RealtimeSettings {
    /// Handshake timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Backoff delay before reconnect attempt `attempt` (1-based), before jitter.
    #[must_use]
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .reconnect_delay_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_reconnect_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL all API paths are joined onto.
    pub api_base_url: String,
    /// Socket.IO endpoint (http(s) or ws(s)).
    pub realtime_url: String,
    /// Domain attribute of the refresh cookie.
    pub cookie_domain: String,
    /// Path attribute of the refresh cookie.
    pub cookie_path: String,
    /// Where the user is sent when the session cannot be recovered.
    pub login_path: String,
    /// Refresh endpoint path.
    pub refresh_path: String,
    /// How the refresh credential is sent.
    pub refresh_mode: RefreshMode,
    /// Lifetime of a stored refresh credential, in days.
    pub refresh_token_ttl_days: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// File the cookie jar is persisted to. In-memory when unset.
    pub credential_file: Option<PathBuf>,
    /// Realtime channel settings.
    pub realtime: RealtimeSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            realtime_url: "http://localhost:8080".to_string(),
            cookie_domain: "localhost".to_string(),
            cookie_path: "/".to_string(),
            login_path: "/bizes/login".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            refresh_mode: RefreshMode::default(),
            refresh_token_ttl_days: 14,
            request_timeout_secs: 30,
            credential_file: None,
            realtime: RealtimeSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Lifetime of a stored refresh credential.
    #[must_use]
    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.refresh_token_ttl_days))
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or not http(s).
    pub fn api_base(&self) -> DomainResult<Url> {
        let url = Url::parse(&self.api_base_url)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.api_base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DomainError::InvalidUrl(format!(
                "API base URL must be http(s): {}",
                self.api_base_url
            )));
        }
        Ok(url)
    }

    /// Parsed realtime URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or has an unsupported scheme.
    pub fn realtime_endpoint(&self) -> DomainResult<Url> {
        let url = Url::parse(&self.realtime_url)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.realtime_url)))?;
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(DomainError::InvalidUrl(format!(
                "realtime URL must be http(s) or ws(s): {}",
                self.realtime_url
            )));
        }
        Ok(url)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> DomainResult<()> {
        self.api_base()?;
        self.realtime_endpoint()?;

        for (name, path) in [
            ("cookie_path", &self.cookie_path),
            ("login_path", &self.login_path),
            ("refresh_path", &self.refresh_path),
        ] {
            if !path.starts_with('/') {
                return Err(DomainError::InvalidConfiguration(format!(
                    "{name} must start with '/': {path}"
                )));
            }
        }

        if self.refresh_token_ttl_days == 0 {
            return Err(DomainError::InvalidConfiguration(
                "refresh_token_ttl_days must be positive".to_string(),
            ));
        }
        if self.realtime.reconnect_delay_ms > self.realtime.max_reconnect_delay_ms {
            return Err(DomainError::InvalidConfiguration(
                "realtime.reconnect_delay_ms exceeds max_reconnect_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}
