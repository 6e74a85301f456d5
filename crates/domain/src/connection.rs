//! Realtime connection state.

use serde::{Deserialize, Serialize};

/// State of the realtime notification connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and receiving events.
    Connected,
    /// Waiting to reconnect after the connection dropped.
    Reconnecting,
    /// Gave up; no further attempts will be made.
    Failed,
    /// Shut down by the client.
    Closed,
}

impl ConnectionState {
    /// Check if the connection is active.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if connection is in progress.
    #[must_use]
    pub const fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }

    /// Check if the channel has stopped for good.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    /// Get a human-readable status string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting...",
            Self::Failed => "Connection Failed",
            Self::Closed => "Closed",
        }
    }
}
