//! Realtime notification fan-out.

mod hub;

pub use hub::{NotificationHub, Subscription};
