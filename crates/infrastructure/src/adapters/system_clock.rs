//! Wall clock adapter

use chrono::{DateTime, Utc};
use pickup_application::ports::Clock;

/// [`Clock`] reading the system time. Used for cookie expiry outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
