//! State shared by the two interception handler kinds.
//!
//! [`HandlerCore`] bundles what every handler carries regardless of shape:
//! its [`Observable`], its [`EventDispatcher`], the event-dispatch gate used
//! during bulk operations, the readonly/disabled policy maps, and the weak
//! parent link. [`crate::object::ObjectHandler`] and
//! [`crate::array::ArrayHandler`] embed one and add their slot storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::array::ArrayHandler;
use crate::event::{ChangeEvent, EventDispatcher};
use crate::object::ObjectHandler;
use crate::observable::{Observable, Observer};

/// A weak link from a handler to its parent handler.
///
/// Parent links never own: a subtree detached from its parent is kept alive
/// only by outside handles, exactly like any other surrogate.
#[derive(Clone)]
pub(crate) enum ParentHandler {
    Object(Weak<ObjectHandler>),
    Array(Weak<ArrayHandler>),
}

impl ParentHandler {
    /// Run `f` against the parent's core, if the parent is still alive.
    pub(crate) fn with_core<R>(&self, f: impl FnOnce(&HandlerCore) -> R) -> Option<R> {
        match self {
            Self::Object(weak) => weak.upgrade().map(|h| f(&h.core)),
            Self::Array(weak) => weak.upgrade().map(|h| f(&h.core)),
        }
    }

    /// The parent as an observer handle, for mutual observation wiring.
    pub(crate) fn observer(&self) -> Weak<dyn Observer> {
        match self {
            Self::Object(weak) => weak.clone() as Weak<dyn Observer>,
            Self::Array(weak) => weak.clone() as Weak<dyn Observer>,
        }
    }

    /// The parent's array handler, when the parent is an array.
    pub(crate) fn as_array(&self) -> Option<Arc<ArrayHandler>> {
        match self {
            Self::Array(weak) => weak.upgrade(),
            Self::Object(_) => None,
        }
    }
}

/// Which policy map an operation addresses.
#[derive(Clone, Copy)]
pub(crate) enum PolicyKind {
    Readonly,
    Disabled,
}

/// One policy dimension: an optional blanket flag plus per-property flags.
#[derive(Default)]
struct PolicyMap {
    all: Option<bool>,
    props: HashMap<String, bool>,
}

/// Shared state embedded in both handler kinds.
pub(crate) struct HandlerCore {
    observable: Observable,
    dispatcher: Arc<EventDispatcher>,
    /// Gate for application-listener dispatch. Suspended during bulk
    /// assignment so listeners do not fire per slot.
    event_enabled: AtomicBool,
    readonly: Mutex<PolicyMap>,
    disabled: Mutex<PolicyMap>,
    parent: Mutex<Option<ParentHandler>>,
}

impl HandlerCore {
    pub(crate) fn new() -> Self {
        Self {
            observable: Observable::new(),
            dispatcher: Arc::new(EventDispatcher::new()),
            event_enabled: AtomicBool::new(true),
            readonly: Mutex::new(PolicyMap::default()),
            disabled: Mutex::new(PolicyMap::default()),
            parent: Mutex::new(None),
        }
    }

    pub(crate) fn observable(&self) -> &Observable {
        &self.observable
    }

    pub(crate) fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Offer an event to the listener chain, honoring the dispatch gate.
    ///
    /// Returns `None` ("no opinion") while suspended.
    pub(crate) fn dispatch(&self, event: &ChangeEvent) -> Option<bool> {
        if !self.event_enabled.load(Ordering::SeqCst) {
            return None;
        }
        self.dispatcher.dispatch(event)
    }

    /// Suspend both listener dispatch and observer notification until the
    /// returned guard drops.
    pub(crate) fn suspend_all(&self) -> HandlerSuspension<'_> {
        self.event_enabled.store(false, Ordering::SeqCst);
        self.observable.suspend_notify();
        HandlerSuspension { core: self }
    }

    pub(crate) fn set_parent_link(&self, parent: ParentHandler) {
        *self.parent.lock() = Some(parent);
    }

    pub(crate) fn parent(&self) -> Option<ParentHandler> {
        self.parent.lock().clone()
    }

    fn policy(&self, kind: PolicyKind) -> &Mutex<PolicyMap> {
        match kind {
            PolicyKind::Readonly => &self.readonly,
            PolicyKind::Disabled => &self.disabled,
        }
    }

    /// Set the blanket flag. Any existing per-property flags are overwritten
    /// so the blanket state is uniform afterwards.
    pub(crate) fn set_all(&self, kind: PolicyKind, value: bool) {
        {
            let mut policy = self.policy(kind).lock();
            policy.all = Some(value);
            for flag in policy.props.values_mut() {
                *flag = value;
            }
        }
        self.observable.notify_observers(None);
    }

    pub(crate) fn set_prop(&self, kind: PolicyKind, property: &str, value: bool) {
        self.policy(kind)
            .lock()
            .props
            .insert(property.to_string(), value);
        self.observable.notify_observers(None);
    }

    /// The effective blanket flag: own if set, else inherited from the
    /// nearest ancestor that set one, else `false`.
    pub(crate) fn is_all(&self, kind: PolicyKind) -> bool {
        if let Some(flag) = self.policy(kind).lock().all {
            return flag;
        }
        self.parent()
            .and_then(|p| p.with_core(|core| core.is_all(kind)))
            .unwrap_or(false)
    }

    /// The explicit per-property flag, if one was set on this handler.
    pub(crate) fn explicit_prop(&self, kind: PolicyKind, property: &str) -> Option<bool> {
        self.policy(kind).lock().props.get(property).copied()
    }

    /// The effective flag for one property.
    ///
    /// Precedence: the array parent's explicit per-property flag, then the
    /// own explicit per-property flag, then the blanket resolution of
    /// [`Self::is_all`].
    pub(crate) fn is_prop(&self, kind: PolicyKind, property: &str) -> bool {
        if let Some(parent) = self.parent().and_then(|p| p.as_array())
            && let Some(flag) = parent.core.explicit_prop(kind, property)
        {
            return flag;
        }
        if let Some(flag) = self.explicit_prop(kind, property) {
            return flag;
        }
        self.is_all(kind)
    }
}

/// RAII guard returned by [`HandlerCore::suspend_all`].
pub(crate) struct HandlerSuspension<'a> {
    core: &'a HandlerCore,
}

impl Drop for HandlerSuspension<'_> {
    fn drop(&mut self) {
        self.core.observable.resume_notify();
        self.core.event_enabled.store(true, Ordering::SeqCst);
    }
}
