//! Clock port
//!
//! Cookie expiry is computed and checked against this clock so tests can
//! pin "now".

use chrono::{DateTime, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}
