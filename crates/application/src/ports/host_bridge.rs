//! Host bridge port

use pickup_domain::OutboundMessage;

/// Outbound channel to a wrapping native shell.
///
/// Delivery is best effort; adapters log failures instead of returning them.
pub trait HostBridge: Send + Sync {
    /// Posts a message to the host.
    fn post(&self, message: &OutboundMessage);
}
