//! Realtime notification channel over Socket.IO.

mod channel;
pub mod packet;

pub use channel::{RealtimeChannel, RealtimeError, socket_target};
