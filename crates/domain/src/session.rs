//! Session credential types.
//!
//! The access token lives only in process memory; the refresh token is
//! persisted in the credential store under [`REFRESH_TOKEN_COOKIE`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Name of the cookie that carries the refresh credential.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Short-lived bearer credential.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

/// Long-lived credential exchanged for a new token pair.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

macro_rules! opaque_token {
    ($ty:ident, $label:literal) => {
        impl $ty {
            /// Wraps a raw token string, rejecting blank values.
            ///
            /// # Errors
            ///
            /// Returns [`DomainError::InvalidToken`] when the value is empty
            /// or whitespace only.
            pub fn new(value: impl Into<String>) -> DomainResult<Self> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(DomainError::InvalidToken(
                        concat!($label, " is empty").to_string(),
                    ));
                }
                Ok(Self(value))
            }

            /// The raw token string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the token, returning the raw string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// A log-safe preview (first 8 chars + ...).
            #[must_use]
            pub fn preview(&self) -> String {
                token_preview(&self.0)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.preview())
            }
        }
    };
}

opaque_token!(AccessToken, "AccessToken");
opaque_token!(RefreshToken, "RefreshToken");

impl AccessToken {
    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

/// Token pair issued by login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// New access token.
    pub access_token: AccessToken,
    /// New refresh token.
    pub refresh_token: RefreshToken,
}

impl TokenPair {
    /// Builds a pair from raw strings.
    ///
    /// # Errors
    ///
    /// Returns an error if either token is blank.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            access_token: AccessToken::new(access)?,
            refresh_token: RefreshToken::new(refresh)?,
        })
    }
}

fn token_preview(token: &str) -> String {
    if token.chars().count() > 12 {
        let cut = token
            .char_indices()
            .nth(8)
            .map_or(token.len(), |(idx, _)| idx);
        format!("{}...", &token[..cut])
    } else {
        token.to_string()
    }
}
