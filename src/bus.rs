//! In-process change notifications
//!
//! `ChangeBus` is a cloneable handle over a shared listener table. Topics are
//! typed and payloads travel as a tagged enum, so a listener for one topic
//! never sees another topic's payload. Notifications stay inside the current
//! process; there is no cross-tab delivery.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

use crate::admin::AdminConfiguration;
use crate::settings::AccessibilitySettings;

/// Notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// End-user accessibility settings changed
    Settings,
    /// Site-owner configuration changed
    Admin,
}

/// Payload published on the bus
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Full settings object after the change
    SettingsChanged(AccessibilitySettings),
    /// New admin configuration; `None` asks listeners to re-read storage
    AdminChanged(Option<AdminConfiguration>),
}

impl ChangeEvent {
    pub fn topic(&self) -> Topic {
        match self {
            ChangeEvent::SettingsChanged(_) => Topic::Settings,
            ChangeEvent::AdminChanged(_) => Topic::Admin,
        }
    }
}

type Listener = Rc<dyn Fn(&ChangeEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Topic, Listener)>,
}

/// Publish/subscribe handle. Clones share the same listener table.
#[derive(Clone, Default)]
pub struct ChangeBus {
    registry: Rc<RefCell<Registry>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `topic`. The listener stays registered until
    /// the returned [`Subscription`] is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, topic: Topic, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, topic, Rc::new(listener)));
        debug!(id, topic = ?topic, "Bus listener subscribed");

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every listener of its topic, in subscription order.
    ///
    /// Listeners are snapshotted before delivery, so a listener may publish or
    /// (un)subscribe re-entrantly.
    pub fn publish(&self, event: ChangeEvent) {
        let topic = event.topic();
        let targets: Vec<Listener> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .map(|(_, _, l)| Rc::clone(l))
            .collect();

        trace!(topic = ?topic, listeners = targets.len(), "Publishing change");
        for listener in targets {
            listener(&event);
        }
    }

    /// Number of live listeners on `topic`
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.registry
            .borrow()
            .listeners
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .count()
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.registry.borrow().listeners.len())
            .finish()
    }
}

/// Scoped listener registration; unsubscribes on drop
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().listeners.retain(|(id, _, _)| *id != self.id);
            debug!(id = self.id, "Bus listener unsubscribed");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
