//! Messages exchanged with a wrapping native shell.

use serde::{Deserialize, Serialize};

/// Message received from the host shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    /// The host holds a refresh credential for this user.
    AutoLogin {
        /// Refresh token kept by the host.
        token: String,
    },
}

/// Message sent to the host shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    /// The client is up and listening for inbound messages.
    WebviewReady,
    /// A new refresh credential was issued; the host should persist it.
    TokenUpdate {
        /// New refresh token.
        token: String,
    },
    /// The session ended; the host should forget its credential.
    Logout,
}
