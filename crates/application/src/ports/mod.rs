//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod credential_store;
mod host_bridge;
mod navigator;
mod transport;

pub use clock::Clock;
pub use credential_store::{CookieScope, CredentialStore, StoreError};
pub use host_bridge::HostBridge;
pub use navigator::LoginNavigator;
pub use transport::{ApiTransport, TransportError};
