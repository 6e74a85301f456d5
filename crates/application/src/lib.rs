//! Pickup Application - Session, gateway and notifications
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for transport, storage and the host shell)
//! - The session context and refresh credential handling
//! - The authenticated request gateway with single-flight refresh
//! - The notification hub the realtime channel publishes into
//! - Use case orchestration

pub mod auth;
pub mod error;
pub mod notifications;
pub mod ports;
pub mod session;
pub mod use_cases;

#[cfg(test)]
mod test_support;

pub use auth::{
    AuthenticatedGateway, GatewaySettings, MemoryCredentialStore, RefreshCredentials,
    RequestPhase, SessionContext, SessionSnapshot,
};
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use notifications::{NotificationHub, Subscription};
pub use ports::{
    ApiTransport, Clock, CookieScope, CredentialStore, HostBridge, LoginNavigator, StoreError,
    TransportError,
};
pub use session::{ClientSession, ClientSessionBuilder};
pub use use_cases::{Profile, UpdateProfile, UpdateProfileInput};
