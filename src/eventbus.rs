//! Subscriber registry for device lifecycle notifications.
//!
//! Listeners are kept in registration order and receive every [`DeviceStateChange`]
//! synchronously. Delivery clones the listener list first, so a listener may subscribe or
//! unsubscribe from inside its own callback without deadlocking the bus.

use std::sync::Arc;

use crate::event::DeviceStateChange;

/// Callback invoked for each device change.
pub type Listener = dyn Fn(&DeviceStateChange) + Send + Sync;

/// Handle returned by [`DeviceEventBus::add_listener`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct ListenerEntry {
    id: SubscriptionId,
    listener: Arc<Listener>,
}

#[derive(Default)]
pub(crate) struct DeviceEventBus {
    next_id: u64,
    listeners: Vec<ListenerEntry>,
}

impl DeviceEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener at the end of the delivery order.
    pub fn add_listener(&mut self, listener: Arc<Listener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push(ListenerEntry { id, listener });
        id
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners in registration order, detached from the bus.
    pub fn snapshot(&self) -> Vec<Arc<Listener>> {
        self.listeners
            .iter()
            .map(|entry| Arc::clone(&entry.listener))
            .collect()
    }
}

/// Deliver `changes` to `listeners`, each change to every listener before the next change.
pub(crate) fn emit_all(listeners: &[Arc<Listener>], changes: &[DeviceStateChange]) {
    for change in changes {
        for listener in listeners {
            listener(change);
        }
    }
}
