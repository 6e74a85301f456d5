//! Pickup Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer:
//! - HTTP transport (reqwest)
//! - File-backed credential store
//! - Socket.IO realtime channel (tokio-tungstenite)
//! - Line-delimited JSON host bridge
//! - Layered configuration loading

pub mod adapters;
pub mod bridge;
pub mod settings;
pub mod persistence;
pub mod realtime;
pub mod serialization;

pub use adapters::{ReqwestTransport, SystemClock};
pub use bridge::{InboundReader, LineBridge};
pub use settings::{ConfigError, ConfigLoader, default_config_file};
pub use persistence::FileCredentialStore;
pub use realtime::{RealtimeChannel, RealtimeError};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};
