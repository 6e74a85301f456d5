//! Pickup Domain - Core client types
//!
//! This crate defines the domain model for the Pickup storefront client:
//! session credentials, the cookie jar that holds the refresh credential,
//! API request/response shapes, realtime notification events and the
//! messages exchanged with a wrapping native shell.
//! All types here are pure Rust with no I/O dependencies.

pub mod bridge;
pub mod config;
pub mod connection;
pub mod cookie;
pub mod error;
pub mod notification;
pub mod phone;
pub mod request;
pub mod session;

pub use bridge::{InboundMessage, OutboundMessage};
pub use config::{ClientConfig, RealtimeSettings, RefreshMode};
pub use connection::ConnectionState;
pub use cookie::{Cookie, CookieJar, SameSite};
pub use error::{DomainError, DomainResult};
pub use notification::{ChangeKind, NotificationEvent, Topic};
pub use phone::PhoneNumber;
pub use request::{ApiEnvelope, ApiRequest, ApiResponse, HttpMethod};
pub use session::{AccessToken, REFRESH_TOKEN_COOKIE, RefreshToken, TokenPair};
