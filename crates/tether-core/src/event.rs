//! Change events and the listener dispatch chain.
//!
//! Events are immutable value objects describing a lifecycle moment of a
//! surrogate: a property is about to change or has changed, an item is about
//! to be selected/moved or has been. Each event carries an [`EventOrigin`]
//! identifying where it started, so handlers can tell a user-facing element's
//! change request apart from internal propagation.
//!
//! [`EventDispatcher`] holds the application-registered listeners for one
//! surrogate. Dispatchers form a chain mirroring the surrogate parent chain;
//! [`EventDispatcher::dispatch`] walks local listeners first, then delegates
//! up the chain, and aggregates the results into a single veto verdict.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::observable::Observer;
use crate::value::Value;

const TARGET: &str = "tether_core::event";

/// The kinds of lifecycle events a surrogate can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A property change has been requested but not committed.
    PropertyChanging,
    /// A property change has been committed.
    PropertyChanged,
    /// An item selection has been requested but not recorded.
    ItemSelecting,
    /// An item selection has been recorded.
    ItemSelected,
    /// An item move has been requested but not applied.
    ItemMoving,
    /// An item move has been applied.
    ItemMoved,
}

/// Where an event originated.
///
/// Element-originated events carry a weak handle to the raising element (used
/// for veto rollback) and an opaque UI-node key. Handler- and API-originated
/// events carry neither.
#[derive(Clone, Default)]
pub struct EventOrigin {
    observer: Option<Weak<dyn Observer>>,
    node: Option<u64>,
}

impl EventOrigin {
    /// An origin identifying a user-facing element.
    pub fn element(observer: Weak<dyn Observer>, node: u64) -> Self {
        Self {
            observer: Some(observer),
            node: Some(node),
        }
    }

    /// An origin for handler- or API-initiated events.
    pub fn internal() -> Self {
        Self::default()
    }

    /// Whether this event started at a user-facing element.
    pub fn is_element(&self) -> bool {
        self.observer.is_some()
    }

    /// The opaque UI-node key of the originating element, if any.
    pub fn node(&self) -> Option<u64> {
        self.node
    }

    /// Deliver an update back to the originating element, if it is still
    /// alive. Used for veto rollback: the element re-renders the committed
    /// state, discarding its rejected proposal.
    pub fn notify(&self, event: Option<&ChangeEvent>) {
        if let Some(observer) = self.observer.as_ref().and_then(Weak::upgrade) {
            observer.update(event);
        }
    }
}

impl fmt::Debug for EventOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventOrigin")
            .field("element", &self.observer.is_some())
            .field("node", &self.node)
            .finish()
    }
}

/// Payload of `PropertyChanging` and `PropertyChanged`.
#[derive(Debug, Clone)]
pub struct PropertyChange {
    /// Where the change originated.
    pub origin: EventOrigin,
    /// Plain snapshot of the owning object at the time the event was built.
    pub data: Value,
    /// The property being changed; may be a dotted path.
    pub property: String,
    /// The proposed (changing) or committed (changed) value.
    pub value: Value,
    /// The item index, when the owning object is an array item.
    pub index: Option<usize>,
}

/// Payload of `ItemSelecting` and `ItemSelected`.
#[derive(Debug, Clone)]
pub struct ItemSelection {
    /// Where the selection originated.
    pub origin: EventOrigin,
    /// Plain snapshot of the owning array.
    pub data: Value,
    /// The index being selected.
    pub index: usize,
}

/// Payload of `ItemMoving` and `ItemMoved`.
#[derive(Debug, Clone)]
pub struct ItemMove {
    /// Where the move originated.
    pub origin: EventOrigin,
    /// Plain snapshot of the owning array.
    pub data: Value,
    /// The position the item is moving from.
    pub from_index: usize,
    /// The position the item is moving to.
    pub to_index: usize,
}

/// A lifecycle event raised by a surrogate.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A property change has been requested.
    PropertyChanging(PropertyChange),
    /// A property change has been committed.
    PropertyChanged(PropertyChange),
    /// An item selection has been requested.
    ItemSelecting(ItemSelection),
    /// An item selection has been recorded.
    ItemSelected(ItemSelection),
    /// An item move has been requested.
    ItemMoving(ItemMove),
    /// An item move has been applied.
    ItemMoved(ItemMove),
}

impl ChangeEvent {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PropertyChanging(_) => EventKind::PropertyChanging,
            Self::PropertyChanged(_) => EventKind::PropertyChanged,
            Self::ItemSelecting(_) => EventKind::ItemSelecting,
            Self::ItemSelected(_) => EventKind::ItemSelected,
            Self::ItemMoving(_) => EventKind::ItemMoving,
            Self::ItemMoved(_) => EventKind::ItemMoved,
        }
    }

    /// The origin carried by this event.
    pub fn origin(&self) -> &EventOrigin {
        match self {
            Self::PropertyChanging(e) | Self::PropertyChanged(e) => &e.origin,
            Self::ItemSelecting(e) | Self::ItemSelected(e) => &e.origin,
            Self::ItemMoving(e) | Self::ItemMoved(e) => &e.origin,
        }
    }
}

/// An application-registered event listener.
///
/// Returning `Some(false)` from a `*-ing` listener vetoes the pending
/// operation. `None` means "ran, no opinion".
pub type EventListener = Arc<dyn Fn(&ChangeEvent) -> Option<bool> + Send + Sync>;

/// Listener table for one surrogate, chained to the surrogate's parent.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Mutex<HashMap<EventKind, Vec<EventListener>>>,
    parent: Mutex<Option<Weak<EventDispatcher>>>,
}

impl EventDispatcher {
    /// Create a dispatcher with no listeners and no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain this dispatcher to a parent.
    ///
    /// Events dispatched here are also offered to the parent's listeners, so
    /// a listener registered on a root surrogate observes its whole subtree.
    pub fn set_parent(&self, parent: &Arc<EventDispatcher>) {
        *self.parent.lock() = Some(Arc::downgrade(parent));
    }

    /// Append a listener for one event kind.
    pub fn add_listener(&self, kind: EventKind, listener: EventListener) {
        self.listeners.lock().entry(kind).or_default().push(listener);
    }

    /// Remove all listeners for one event kind.
    pub fn clear_listeners(&self, kind: EventKind) {
        self.listeners.lock().remove(&kind);
    }

    /// Replace the listeners for one event kind with a single listener.
    pub fn set_listener(&self, kind: EventKind, listener: EventListener) {
        let mut listeners = self.listeners.lock();
        listeners.insert(kind, vec![listener]);
    }

    /// Offer an event to local listeners, then up the parent chain.
    ///
    /// Aggregation: `Some(false)` if any listener anywhere in the chain
    /// returned `false`; else `Some(true)` if at least one listener ran;
    /// else `None`.
    pub fn dispatch(&self, event: &ChangeEvent) -> Option<bool> {
        let mut ran = false;
        let mut vetoed = false;
        self.collect(event, &mut ran, &mut vetoed);
        tracing::trace!(
            target: TARGET,
            kind = ?event.kind(),
            ran,
            vetoed,
            "dispatched event"
        );
        if vetoed {
            Some(false)
        } else if ran {
            Some(true)
        } else {
            None
        }
    }

    fn collect(&self, event: &ChangeEvent, ran: &mut bool, vetoed: &mut bool) {
        let local: Vec<EventListener> = self
            .listeners
            .lock()
            .get(&event.kind())
            .map(|v| v.to_vec())
            .unwrap_or_default();
        for listener in local {
            *ran = true;
            if listener(event) == Some(false) {
                *vetoed = true;
            }
        }
        let parent = self.parent.lock().clone();
        if let Some(parent) = parent.and_then(|weak| weak.upgrade()) {
            parent.collect(event, ran, vetoed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn changed_event() -> ChangeEvent {
        ChangeEvent::PropertyChanged(PropertyChange {
            origin: EventOrigin::internal(),
            data: Value::Null,
            property: "name".into(),
            value: Value::String("x".into()),
            index: None,
        })
    }

    #[test]
    fn test_dispatch_with_no_listeners_is_none() {
        let dispatcher = EventDispatcher::new();
        assert_eq!(dispatcher.dispatch(&changed_event()), None);
    }

    #[test]
    fn test_dispatch_aggregates_veto() {
        let dispatcher = EventDispatcher::new();
        dispatcher.add_listener(EventKind::PropertyChanged, Arc::new(|_| Some(true)));
        dispatcher.add_listener(EventKind::PropertyChanged, Arc::new(|_| Some(false)));
        dispatcher.add_listener(EventKind::PropertyChanged, Arc::new(|_| None));
        assert_eq!(dispatcher.dispatch(&changed_event()), Some(false));
    }

    #[test]
    fn test_dispatch_no_opinion_counts_as_ran() {
        let dispatcher = EventDispatcher::new();
        dispatcher.add_listener(EventKind::PropertyChanged, Arc::new(|_| None));
        assert_eq!(dispatcher.dispatch(&changed_event()), Some(true));
    }

    #[test]
    fn test_dispatch_walks_parent_chain() {
        let parent = Arc::new(EventDispatcher::new());
        let child = EventDispatcher::new();
        child.set_parent(&parent);

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_parent = Arc::clone(&seen);
        parent.add_listener(
            EventKind::PropertyChanged,
            Arc::new(move |_| {
                seen_parent.lock().unwrap().push("parent");
                Some(false)
            }),
        );
        let seen_child = Arc::clone(&seen);
        child.add_listener(
            EventKind::PropertyChanged,
            Arc::new(move |_| {
                seen_child.lock().unwrap().push("child");
                Some(true)
            }),
        );

        assert_eq!(child.dispatch(&changed_event()), Some(false));
        assert_eq!(*seen.lock().unwrap(), vec!["child", "parent"]);
    }

    #[test]
    fn test_set_listener_replaces_previous() {
        let dispatcher = EventDispatcher::new();
        dispatcher.set_listener(EventKind::PropertyChanged, Arc::new(|_| Some(false)));
        dispatcher.set_listener(EventKind::PropertyChanged, Arc::new(|_| Some(true)));
        assert_eq!(dispatcher.dispatch(&changed_event()), Some(true));
    }

    #[test]
    fn test_listener_only_sees_matching_kind() {
        let dispatcher = EventDispatcher::new();
        dispatcher.add_listener(EventKind::ItemSelected, Arc::new(|_| Some(false)));
        assert_eq!(dispatcher.dispatch(&changed_event()), None);
    }
}
