//! Observable/observer notification for Tether.
//!
//! Every interception handler and every binding element carries an
//! [`Observable`]. Observers register with a [`Weak`] handle, so dropping a
//! bound element is enough to retire its subscription; the next notification
//! prunes the dead entry.
//!
//! # Key Types
//!
//! - [`Observable`] - An ordered observer list with a suspend/resume gate
//! - [`Observer`] - The update callback trait
//! - [`ObserverId`] - Unique identifier returned when registering
//! - [`NotifySuspension`] - RAII guard that resumes notification on drop
//!
//! # Suspension semantics
//!
//! Notifications issued while the gate is suspended are **dropped**, not
//! queued. Bulk operations rely on this: they suspend, mutate many slots, and
//! issue a single notification after resuming.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Weak;

use parking_lot::Mutex;

use crate::event::ChangeEvent;

/// The logging target for notification fan-out traces.
const TARGET: &str = "tether_core::observable";

/// Receives change notifications from an [`Observable`].
///
/// `event` is `None` for coarse "state changed, re-read it" notifications
/// (programmatic sets, bulk assignment, policy changes) and `Some` when a
/// specific lifecycle event is being propagated.
pub trait Observer: Send + Sync {
    /// Called synchronously on the notifying thread.
    fn update(&self, event: Option<&ChangeEvent>);
}

/// A unique identifier for a registered observer.
///
/// Use this ID to remove a specific observer via
/// [`Observable::remove_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// An ordered list of observers with a suspend/resume notification gate.
///
/// Observers are invoked in registration order. The list holds weak
/// references; entries whose observer has been dropped are pruned during
/// notification.
pub struct Observable {
    /// Registered observers, in registration order.
    observers: Mutex<Vec<(ObserverId, Weak<dyn Observer>)>>,
    /// Whether notifications are currently delivered.
    notify_enabled: AtomicBool,
    /// Counter backing `ObserverId` allocation.
    next_id: AtomicU64,
}

impl Default for Observable {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable {
    /// Create a new observable with no observers and notification enabled.
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            notify_enabled: AtomicBool::new(true),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register an observer.
    ///
    /// The observable keeps only a weak handle; the caller retains ownership
    /// of the observer's lifetime.
    pub fn add_observer(&self, observer: Weak<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, observer));
        id
    }

    /// Remove a specific observer by its ID.
    ///
    /// Returns `true` if the observer was found and removed.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(entry_id, _)| *entry_id != id);
        observers.len() != before
    }

    /// The number of registered observers, dead entries included.
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Whether notifications are currently delivered.
    pub fn is_notify_enabled(&self) -> bool {
        self.notify_enabled.load(Ordering::SeqCst)
    }

    /// Stop delivering notifications.
    ///
    /// Notifications issued while suspended are dropped.
    pub fn suspend_notify(&self) {
        self.notify_enabled.store(false, Ordering::SeqCst);
    }

    /// Resume delivering notifications.
    ///
    /// Nothing dropped during suspension is replayed.
    pub fn resume_notify(&self) {
        self.notify_enabled.store(true, Ordering::SeqCst);
    }

    /// Suspend notification for the lifetime of the returned guard.
    pub fn suspend_scope(&self) -> NotifySuspension<'_> {
        self.suspend_notify();
        NotifySuspension { observable: self }
    }

    /// Notify all live observers, in registration order.
    ///
    /// Observer callbacks run outside the list lock, so an observer may
    /// register or remove observers (on this or any other observable) from
    /// within `update`. Entries whose observer has been dropped are pruned.
    pub fn notify_observers(&self, event: Option<&ChangeEvent>) {
        if !self.is_notify_enabled() {
            tracing::trace!(target: TARGET, "notification suspended; event dropped");
            return;
        }
        let live: Vec<_> = {
            let mut observers = self.observers.lock();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers
                .iter()
                .filter_map(|(_, weak)| weak.upgrade())
                .collect()
        };
        tracing::trace!(
            target: TARGET,
            observers = live.len(),
            event = ?event.map(|e| e.kind()),
            "notifying observers"
        );
        for observer in live {
            observer.update(event);
        }
    }
}

/// RAII guard returned by [`Observable::suspend_scope`].
///
/// Notification resumes when the guard is dropped.
pub struct NotifySuspension<'a> {
    observable: &'a Observable,
}

impl Drop for NotifySuspension<'_> {
    fn drop(&mut self) {
        self.observable.resume_notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    struct Recorder {
        label: &'static str,
        log: Arc<StdMutex<Vec<&'static str>>>,
    }

    impl Observer for Recorder {
        fn update(&self, _event: Option<&ChangeEvent>) {
            self.log.lock().unwrap().push(self.label);
        }
    }

    fn recorder(label: &'static str, log: &Arc<StdMutex<Vec<&'static str>>>) -> Arc<Recorder> {
        Arc::new(Recorder {
            label,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn test_notify_in_registration_order() {
        let observable = Observable::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let c = recorder("c", &log);
        observable.add_observer(Arc::downgrade(&a) as _);
        observable.add_observer(Arc::downgrade(&b) as _);
        observable.add_observer(Arc::downgrade(&c) as _);

        observable.notify_observers(None);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_observer() {
        let observable = Observable::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let id_a = observable.add_observer(Arc::downgrade(&a) as _);
        observable.add_observer(Arc::downgrade(&b) as _);

        assert!(observable.remove_observer(id_a));
        assert!(!observable.remove_observer(id_a));
        observable.notify_observers(None);
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_suspended_notifications_are_dropped() {
        let observable = Observable::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = recorder("a", &log);
        observable.add_observer(Arc::downgrade(&a) as _);

        observable.suspend_notify();
        observable.notify_observers(None);
        observable.notify_observers(None);
        observable.resume_notify();
        assert!(log.lock().unwrap().is_empty());

        observable.notify_observers(None);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_suspend_scope_resumes_on_drop() {
        let observable = Observable::new();
        {
            let _guard = observable.suspend_scope();
            assert!(!observable.is_notify_enabled());
        }
        assert!(observable.is_notify_enabled());
    }

    #[test]
    fn test_dropped_observer_is_pruned() {
        let observable = Observable::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        observable.add_observer(Arc::downgrade(&a) as _);
        observable.add_observer(Arc::downgrade(&b) as _);
        drop(a);

        observable.notify_observers(None);
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
        assert_eq!(observable.observer_count(), 1);
    }

    #[test]
    fn test_observer_can_mutate_list_during_update() {
        struct SelfRemover {
            observable: Arc<Observable>,
            id: StdMutex<Option<ObserverId>>,
            calls: Arc<StdMutex<usize>>,
        }
        impl Observer for SelfRemover {
            fn update(&self, _event: Option<&ChangeEvent>) {
                *self.calls.lock().unwrap() += 1;
                if let Some(id) = self.id.lock().unwrap().take() {
                    self.observable.remove_observer(id);
                }
            }
        }

        let observable = Arc::new(Observable::new());
        let calls = Arc::new(StdMutex::new(0));
        let remover = Arc::new(SelfRemover {
            observable: Arc::clone(&observable),
            id: StdMutex::new(None),
            calls: Arc::clone(&calls),
        });
        let id = observable.add_observer(Arc::downgrade(&remover) as _);
        *remover.id.lock().unwrap() = Some(id);

        observable.notify_observers(None);
        observable.notify_observers(None);
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
