//! In-process publish/subscribe bus connecting views that mutate component
//! configuration with views that display it.
//!
//! Delivery is synchronous and fire-and-forget. Listeners of one event name
//! are called in registration order; there is no ordering across names.
//! A [`Subscription`] removes its listener when dropped, so a view that
//! holds its subscriptions for as long as it is mounted cannot leak them.

use crate::core::component::{ComponentConfig, ComponentInstance};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Names listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventName {
    NotebookConfigUpdated,
    ComponentAdded,
    ComponentUpdated,
    ComponentDeleted,
    Refresh,
}

/// Which component a component event concerns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentChange {
    pub notebook_id: String,
    pub component_id: String,
    pub component_type: String,
    /// The full resulting instance list, when the emitter has it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<ComponentInstance>>,
}

/// An event and its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum JournalEvent {
    NotebookConfigUpdated { notebook_id: String, config: ComponentConfig },
    ComponentAdded(ComponentChange),
    ComponentUpdated(ComponentChange),
    ComponentDeleted(ComponentChange),
    /// Generic "reload whatever you show" broadcast; `notebook_id` narrows it when set.
    Refresh { notebook_id: Option<String> },
}

impl JournalEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::NotebookConfigUpdated { .. } => EventName::NotebookConfigUpdated,
            Self::ComponentAdded(_) => EventName::ComponentAdded,
            Self::ComponentUpdated(_) => EventName::ComponentUpdated,
            Self::ComponentDeleted(_) => EventName::ComponentDeleted,
            Self::Refresh { .. } => EventName::Refresh,
        }
    }

    /// The notebook this event concerns, if any.
    pub fn notebook_id(&self) -> Option<&str> {
        match self {
            Self::NotebookConfigUpdated { notebook_id, .. } => Some(notebook_id),
            Self::ComponentAdded(c) | Self::ComponentUpdated(c) | Self::ComponentDeleted(c) => {
                Some(&c.notebook_id)
            }
            Self::Refresh { notebook_id } => notebook_id.as_deref(),
        }
    }
}

type Handler = Arc<dyn Fn(&JournalEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    by_name: HashMap<EventName, Vec<(u64, Handler)>>,
}

/// Cloneable handle to a shared event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Listeners>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `name`; the listener lives until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    #[must_use = "dropping the subscription removes the listener immediately"]
    pub fn on<F>(&self, name: EventName, handler: F) -> Subscription
    where
        F: Fn(&JournalEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .by_name
            .entry(name)
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription { bus: Arc::downgrade(&self.listeners), name, id, active: true }
    }

    /// Delivers `event` to every listener of its name, in registration order.
    ///
    /// The listener list is snapshotted first, so handlers may emit or
    /// (un)subscribe without deadlocking; such changes apply to the next emit.
    pub fn emit(&self, event: &JournalEvent) {
        let handlers: Vec<Handler> = {
            let guard = self.listeners.lock().unwrap();
            guard
                .by_name
                .get(&event.name())
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        log::debug!("emitting {:?} to {} listener(s)", event.name(), handlers.len());
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self, name: EventName) -> usize {
        self.listeners.lock().unwrap().by_name.get(&name).map_or(0, Vec::len)
    }
}

/// Handle to one registered listener.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<Mutex<Listeners>>,
    name: EventName,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Removes the listener now. Dropping the subscription does the same.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let Some(listeners) = self.bus.upgrade() else {
            return;
        };
        let Ok(mut guard) = listeners.lock() else {
            return;
        };
        if let Some(list) = guard.by_name.get_mut(&self.name) {
            list.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refresh() -> JournalEvent {
        JournalEvent::Refresh { notebook_id: Some("nb-1".to_string()) }
    }

    #[test]
    fn test_fifo_delivery_within_a_name() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s1 = Arc::clone(&seen);
        let s2 = Arc::clone(&seen);
        let _a = bus.on(EventName::Refresh, move |_| s1.lock().unwrap().push("first"));
        let _b = bus.on(EventName::Refresh, move |_| s2.lock().unwrap().push("second"));

        bus.emit(&refresh());
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_only_matching_name_is_delivered() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = Arc::clone(&hits);
        let _sub = bus.on(EventName::ComponentAdded, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(&refresh());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = Arc::clone(&hits);
        let sub = bus.on(EventName::Refresh, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(bus.listener_count(EventName::Refresh), 1);
        bus.emit(&refresh());
        drop(sub);
        assert_eq!(bus.listener_count(EventName::Refresh), 0);
        bus.emit(&refresh());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_unsubscribe_keeps_other_listeners() {
        let bus = EventBus::new();
        let a = bus.on(EventName::Refresh, |_| {});
        let _b = bus.on(EventName::Refresh, |_| {});
        a.unsubscribe();
        assert_eq!(bus.listener_count(EventName::Refresh), 1);
    }

    #[test]
    fn test_handler_may_emit_reentrantly() {
        let bus = EventBus::new();
        let inner_hits = Arc::new(AtomicU64::new(0));
        let h = Arc::clone(&inner_hits);
        let _inner = bus.on(EventName::Refresh, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let relay = bus.clone();
        let _outer = bus.on(EventName::ComponentDeleted, move |event| {
            relay.emit(&JournalEvent::Refresh { notebook_id: event.notebook_id().map(str::to_string) });
        });

        bus.emit(&JournalEvent::ComponentDeleted(ComponentChange {
            notebook_id: "nb-1".to_string(),
            component_id: "c1".to_string(),
            component_type: "chart".to_string(),
            instances: None,
        }));
        assert_eq!(inner_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outliving_bus_is_harmless() {
        let bus = EventBus::new();
        let sub = bus.on(EventName::Refresh, |_| {});
        drop(bus);
        drop(sub);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(refresh()).unwrap();
        assert_eq!(json["event"], "refresh");
        assert_eq!(json["detail"]["notebookId"], "nb-1");

        let updated = JournalEvent::NotebookConfigUpdated {
            notebook_id: "nb-1".to_string(),
            config: ComponentConfig::default(),
        };
        let json = serde_json::to_value(updated).unwrap();
        assert_eq!(json["event"], "notebook-config-updated");
        assert_eq!(json["detail"]["notebookId"], "nb-1");
        assert!(json["detail"].get("notebook_id").is_none());
        assert!(json["detail"]["config"].is_object());
    }
}
