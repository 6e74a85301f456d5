//! Listener registry the realtime connection publishes into.
//!
//! A subscription registers exactly one listener per subscribed event
//! name and remembers their ids, so unsubscribing detaches those four
//! listeners and nothing else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use pickup_domain::NotificationEvent;
use pickup_domain::notification::{INQUIRY_UPDATE, NEW_INQUIRY, NEW_ORDER, ORDER_UPDATE};
use uuid::Uuid;

type Listener = Arc<dyn Fn(&NotificationEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    listeners: HashMap<&'static str, Vec<(Uuid, Listener)>>,
}

impl Registry {
    fn add(&mut self, name: &'static str, listener: Listener) -> Uuid {
        let id = Uuid::now_v7();
        self.listeners.entry(name).or_default().push((id, listener));
        id
    }

    fn remove(&mut self, name: &str, id: Uuid) {
        if let Some(entries) = self.listeners.get_mut(name) {
            entries.retain(|(existing, _)| *existing != id);
            if entries.is_empty() {
                self.listeners.remove(name);
            }
        }
    }
}

/// Shared registry of notification listeners.
#[derive(Clone, Default)]
pub struct NotificationHub {
    registry: Arc<Mutex<Registry>>,
}

impl NotificationHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `on_order` for order events and `on_inquiry` for inquiry
    /// events.
    ///
    /// The returned [`Subscription`] detaches both when dropped or when
    /// [`Subscription::unsubscribe`] is called.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<O, I>(&self, on_order: O, on_inquiry: I) -> Subscription
    where
        O: Fn(&NotificationEvent) + Send + Sync + 'static,
        I: Fn(&NotificationEvent) + Send + Sync + 'static,
    {
        let on_order: Listener = Arc::new(on_order);
        let on_inquiry: Listener = Arc::new(on_inquiry);

        let mut registry = self.lock();
        let registrations = vec![
            (NEW_ORDER, registry.add(NEW_ORDER, on_order.clone())),
            (ORDER_UPDATE, registry.add(ORDER_UPDATE, on_order)),
            (NEW_INQUIRY, registry.add(NEW_INQUIRY, on_inquiry.clone())),
            (INQUIRY_UPDATE, registry.add(INQUIRY_UPDATE, on_inquiry)),
        ];
        drop(registry);

        tracing::debug!("notification subscription added");
        Subscription {
            registry: Arc::downgrade(&self.registry),
            registrations,
        }
    }

    /// Number of listeners registered for an event name.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.lock().listeners.get(name).map_or(0, Vec::len)
    }

    /// Total number of registered listeners.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.lock().listeners.values().map(Vec::len).sum()
    }

    /// Decodes and delivers one event. Returns how many listeners ran.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe from inside the callback.
    pub fn dispatch(&self, name: &str, payload: serde_json::Value) -> usize {
        let Some(event) = NotificationEvent::from_wire(name, payload) else {
            tracing::debug!(event = name, "ignoring unknown notification");
            return 0;
        };

        let listeners: Vec<Listener> = self
            .lock()
            .listeners
            .get(name)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in &listeners {
            listener(&event);
        }
        tracing::trace!(event = name, delivered = listeners.len(), "notification dispatched");
        listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle for one `subscribe` call.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    registrations: Vec<(&'static str, Uuid)>,
}

impl Subscription {
    /// Detaches the listeners this subscription registered.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    /// Event names this subscription listens to.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|(name, _)| *name).collect()
    }

    fn detach(&mut self) {
        let registrations = std::mem::take(&mut self.registrations);
        if registrations.is_empty() {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            for (name, id) in registrations {
                registry.remove(name, id);
            }
            tracing::debug!("notification subscription removed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pickup_domain::notification::SUBSCRIBED_EVENTS;
    use pickup_domain::{ChangeKind, Topic};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&NotificationEvent) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move |_: &NotificationEvent| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_subscribe_registers_four_listeners() {
        let hub = NotificationHub::new();
        let subscription = hub.subscribe(|_| {}, |_| {});

        for name in SUBSCRIBED_EVENTS {
            assert_eq!(hub.listener_count(name), 1, "{name}");
        }
        assert_eq!(hub.total_listeners(), 4);
        assert_eq!(subscription.event_names().len(), 4);
    }

    #[test]
    fn test_unsubscribe_leaves_zero_listeners() {
        let hub = NotificationHub::new();
        let subscription = hub.subscribe(|_| {}, |_| {});
        subscription.unsubscribe();

        for name in SUBSCRIBED_EVENTS {
            assert_eq!(hub.listener_count(name), 0, "{name}");
        }
        assert_eq!(hub.total_listeners(), 0);
    }

    #[test]
    fn test_unsubscribe_detaches_only_own_listeners() {
        let hub = NotificationHub::new();
        let (kept_orders, on_order) = counter();
        let kept = hub.subscribe(on_order, |_| {});
        let dropped = hub.subscribe(|_| {}, |_| {});

        drop(dropped);
        assert_eq!(hub.total_listeners(), 4);

        hub.dispatch(NEW_ORDER, json!({"orderId": 1}));
        assert_eq!(kept_orders.load(Ordering::SeqCst), 1);
        drop(kept);
        assert_eq!(hub.total_listeners(), 0);
    }

    #[test]
    fn test_dispatch_routes_by_topic() {
        let hub = NotificationHub::new();
        let (orders, on_order) = counter();
        let (inquiries, on_inquiry) = counter();
        let _subscription = hub.subscribe(on_order, on_inquiry);

        assert_eq!(hub.dispatch(NEW_ORDER, json!({})), 1);
        assert_eq!(hub.dispatch(ORDER_UPDATE, json!({})), 1);
        assert_eq!(hub.dispatch(INQUIRY_UPDATE, json!({})), 1);
        assert_eq!(hub.dispatch("somethingElse", json!({})), 0);

        assert_eq!(orders.load(Ordering::SeqCst), 2);
        assert_eq!(inquiries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_receives_decoded_event() {
        let hub = NotificationHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = hub.subscribe(
            move |event| sink.lock().unwrap().push(event.clone()),
            |_| {},
        );

        hub.dispatch(ORDER_UPDATE, json!({"orderId": 9, "action": "delete"}));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].topic, Topic::Order);
        assert_eq!(seen[0].change, ChangeKind::Delete);
        assert_eq!(seen[0].payload["orderId"], 9);
    }

    #[test]
    fn test_subscription_outliving_hub_is_harmless() {
        let hub = NotificationHub::new();
        let subscription = hub.subscribe(|_| {}, |_| {});
        drop(hub);
        subscription.unsubscribe();
    }
}
