//! Realtime notification events.
//!
//! The server pushes four event names. Each maps to a [`Topic`] and a
//! default [`ChangeKind`]; an update payload may downgrade itself to a
//! delete by carrying `"action": "delete"` or `"deleted": true`.

use serde::{Deserialize, Serialize};

/// Event name for a newly created order.
pub const NEW_ORDER: &str = "newOrder";
/// Event name for a changed order.
pub const ORDER_UPDATE: &str = "orderUpdate";
/// Event name for a newly created inquiry.
pub const NEW_INQUIRY: &str = "newInquiry";
/// Event name for a changed inquiry.
pub const INQUIRY_UPDATE: &str = "inquiryUpdate";

/// All event names a subscription listens to.
pub const SUBSCRIBED_EVENTS: [&str; 4] = [NEW_ORDER, ORDER_UPDATE, NEW_INQUIRY, INQUIRY_UPDATE];

/// What the event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// A pickup order.
    Order,
    /// A customer inquiry.
    Inquiry,
}

/// What happened to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Subject was created.
    Create,
    /// Subject was changed.
    Update,
    /// Subject was removed.
    Delete,
}

/// A decoded notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Subject kind.
    pub topic: Topic,
    /// Change kind.
    pub change: ChangeKind,
    /// Raw payload as sent by the server.
    pub payload: serde_json::Value,
}

impl NotificationEvent {
    /// Decodes an event by wire name. Unknown names yield `None`.
    #[must_use]
    pub fn from_wire(name: &str, payload: serde_json::Value) -> Option<Self> {
        let (topic, change) = match name {
            NEW_ORDER => (Topic::Order, ChangeKind::Create),
            ORDER_UPDATE => (Topic::Order, update_kind(&payload)),
            NEW_INQUIRY => (Topic::Inquiry, ChangeKind::Create),
            INQUIRY_UPDATE => (Topic::Inquiry, update_kind(&payload)),
            _ => return None,
        };
        Some(Self {
            topic,
            change,
            payload,
        })
    }

    /// The topic an event name belongs to.
    #[must_use]
    pub fn topic_of(name: &str) -> Option<Topic> {
        match name {
            NEW_ORDER | ORDER_UPDATE => Some(Topic::Order),
            NEW_INQUIRY | INQUIRY_UPDATE => Some(Topic::Inquiry),
            _ => None,
        }
    }
}

fn update_kind(payload: &serde_json::Value) -> ChangeKind {
    let action_delete = payload
        .get("action")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|a| a.eq_ignore_ascii_case("delete"));
    let flagged_deleted = payload
        .get("deleted")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    if action_delete || flagged_deleted {
        ChangeKind::Delete
    } else {
        ChangeKind::Update
    }
}
