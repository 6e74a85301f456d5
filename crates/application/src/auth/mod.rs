//! Authentication pipeline.
//!
//! This module provides:
//! - Cookie-backed credential storage for the refresh token
//! - The in-memory session context holding the access token
//! - The authenticated request gateway and its refresh protocol

mod credentials;
mod gateway;
mod session_context;

pub use credentials::{MemoryCredentialStore, RefreshCredentials};
pub use gateway::{AuthenticatedGateway, GatewaySettings, RequestPhase};
pub use session_context::{SessionContext, SessionSnapshot};
