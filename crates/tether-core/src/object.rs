//! Object interception handler.
//!
//! [`ObjectHandler`] is the observable stand-in for one plain object. It
//! owns the object's slots, the readonly/disabled policy, and the
//! property-change state machine: an element's change request is offered to
//! the listener chain, committed only if not vetoed, and rolled back (by
//! re-rendering the origin element) if it is.
//!
//! Handlers are always held through [`crate::ObjectSurrogate`]; the handle
//! type carries the public API.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::event::{ChangeEvent, EventOrigin, PropertyChange};
use crate::handler::{HandlerCore, ParentHandler, PolicyKind};
use crate::observable::Observer;
use crate::surrogate::{ArraySurrogate, ObjectSurrogate, Slot};
use crate::value::Value;

const TARGET: &str = "tether_core::object";

/// Interception state for one observed object.
pub struct ObjectHandler {
    pub(crate) core: HandlerCore,
    weak_self: Weak<ObjectHandler>,
    slots: Mutex<BTreeMap<String, Slot>>,
    /// Deep plain snapshot taken by `save`, re-applied by `reset`.
    origin: Mutex<Value>,
}

impl ObjectHandler {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            core: HandlerCore::new(),
            weak_self: weak_self.clone(),
            slots: Mutex::new(BTreeMap::new()),
            origin: Mutex::new(Value::Object(BTreeMap::new())),
        })
    }

    pub(crate) fn core(&self) -> &HandlerCore {
        &self.core
    }

    /// Link this handler under a parent: store the weak link, wire mutual
    /// observation, and chain the event dispatchers.
    pub(crate) fn attach_parent(&self, parent: ParentHandler) {
        self.core.observable().add_observer(parent.observer());
        parent.with_core(|parent_core| {
            parent_core
                .observable()
                .add_observer(self.weak_self.clone() as Weak<dyn Observer>);
            self.core.dispatcher().set_parent(parent_core.dispatcher());
        });
        self.core.set_parent_link(parent);
    }

    /// Wrap a plain value into a slot, parenting any child surrogate here.
    pub(crate) fn wrap_slot(&self, value: Value) -> Slot {
        match value {
            Value::Object(_) => {
                let child = ObjectSurrogate::from_object_value(value);
                child
                    .handler()
                    .attach_parent(ParentHandler::Object(self.weak_self.clone()));
                Slot::Object(child)
            }
            Value::Array(_) => {
                let child = ArraySurrogate::from_array_value(value);
                child
                    .handler()
                    .attach_parent(ParentHandler::Object(self.weak_self.clone()));
                Slot::Array(child)
            }
            primitive => Slot::Leaf(primitive),
        }
    }

    pub(crate) fn slot(&self, property: &str) -> Option<Slot> {
        self.slots.lock().get(property).cloned()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.slots.lock().keys().cloned().collect()
    }

    /// Plain deep snapshot of the object.
    pub(crate) fn to_value(&self) -> Value {
        let slots = self.slots.lock();
        Value::Object(
            slots
                .iter()
                .map(|(key, slot)| (key.clone(), slot.to_value()))
                .collect(),
        )
    }

    /// Store one property and surface the committed change.
    ///
    /// Structured values are wrapped before storing, so every nested value
    /// stays a surrogate. Every write, element-originated or not, surfaces
    /// as a `PropertyChanged` to observers, listeners, and an observing
    /// array parent. Writes under an active suspension stay silent.
    pub(crate) fn set(&self, property: &str, value: Value) {
        let slot = self.wrap_slot(value.clone());
        self.slots.lock().insert(property.to_string(), slot);
        if !self.core.observable().is_notify_enabled() {
            return;
        }
        let changed = ChangeEvent::PropertyChanged(PropertyChange {
            origin: EventOrigin::internal(),
            data: self.to_value(),
            property: property.to_string(),
            value,
            index: None,
        });
        self.core.observable().notify_observers(Some(&changed));
        self.core.dispatch(&changed);
        if let Some(parent) = self.core.parent().and_then(|p| p.as_array()) {
            parent.rebroadcast(&changed);
        }
    }

    /// Read a plain value at a dotted path. `None` for missing segments or
    /// a primitive in an intermediate position.
    pub(crate) fn value_at(&self, path: &str) -> Option<Value> {
        let (head, rest) = split_path(path);
        let slot = self.slot(head)?;
        match rest {
            None => Some(slot.to_value()),
            Some(rest) => match slot {
                Slot::Object(child) => child.handler().value_at(rest),
                Slot::Array(child) => child.handler().value_at(rest),
                Slot::Leaf(_) => None,
            },
        }
    }

    /// Write a plain value at a dotted path.
    ///
    /// The handler owning the final segment issues the notification.
    /// Returns `false` (and logs) if an intermediate segment is missing or
    /// primitive.
    pub(crate) fn set_value_at(&self, path: &str, value: Value) -> bool {
        let (head, rest) = split_path(path);
        match rest {
            None => {
                self.set(head, value);
                true
            }
            Some(rest) => {
                let Some(slot) = self.slot(head) else {
                    tracing::warn!(target: TARGET, path, segment = head, "path segment not found");
                    return false;
                };
                match slot {
                    Slot::Object(child) => child.handler().set_value_at(rest, value),
                    Slot::Array(child) => child.handler().set_value_at(rest, value),
                    Slot::Leaf(_) => {
                        tracing::warn!(
                            target: TARGET,
                            path,
                            segment = head,
                            "path segment is a primitive"
                        );
                        false
                    }
                }
            }
        }
    }

    /// Write a plain value at a dotted path without notifying from this
    /// handler or any delegate along the path. Failure cases match
    /// `set_value_at`.
    pub(crate) fn write_value_at(&self, path: &str, value: Value) -> bool {
        let (head, rest) = split_path(path);
        match rest {
            None => {
                let slot = self.wrap_slot(value);
                self.slots.lock().insert(head.to_string(), slot);
                true
            }
            Some(rest) => {
                let Some(slot) = self.slot(head) else {
                    tracing::warn!(target: TARGET, path, segment = head, "path segment not found");
                    return false;
                };
                match slot {
                    Slot::Object(child) => child.handler().write_value_at(rest, value),
                    Slot::Array(child) => child.handler().write_value_at(rest, value),
                    Slot::Leaf(_) => {
                        tracing::warn!(
                            target: TARGET,
                            path,
                            segment = head,
                            "path segment is a primitive"
                        );
                        false
                    }
                }
            }
        }
    }

    /// Merge a plain object into the existing slots.
    ///
    /// Children whose shape matches the incoming value are assigned into
    /// recursively, preserving their identity and any listeners registered
    /// on them; everything else is replaced by a fresh wrap. Notification
    /// and listener dispatch are suspended for the duration; exactly one
    /// coarse notification is issued at the end.
    pub(crate) fn assign(&self, value: Value) {
        {
            let _suspended = self.core.suspend_all();
            if let Value::Object(map) = value {
                for (key, entry) in map {
                    self.merge_entry(key, entry);
                }
            }
        }
        self.core.observable().notify_observers(None);
    }

    fn merge_entry(&self, key: String, value: Value) {
        let existing = self.slots.lock().get(&key).cloned();
        match (existing, value) {
            (Some(Slot::Object(child)), value @ Value::Object(_)) => {
                child.handler().assign(value);
            }
            (Some(Slot::Array(child)), value @ Value::Array(_)) => {
                child.handler().assign(value);
            }
            (_, value) => {
                let slot = self.wrap_slot(value);
                self.slots.lock().insert(key, slot);
            }
        }
    }

    /// Null out leaves and clear child surrogates in place, then notify
    /// once.
    pub(crate) fn clear(&self) {
        let children: Vec<Slot> = {
            let _suspended = self.core.suspend_all();
            let mut slots = self.slots.lock();
            let mut children = Vec::new();
            for slot in slots.values_mut() {
                match slot {
                    Slot::Leaf(value) => *value = Value::Null,
                    structured => children.push(structured.clone()),
                }
            }
            children
        };
        for child in children {
            match child {
                Slot::Object(child) => child.handler().clear(),
                Slot::Array(child) => child.handler().clear(),
                Slot::Leaf(_) => {}
            }
        }
        self.core.observable().notify_observers(None);
    }

    /// Snapshot the current state as the origin.
    pub(crate) fn save(&self) {
        *self.origin.lock() = self.to_value();
    }

    /// Re-assign the origin snapshot.
    pub(crate) fn reset(&self) {
        let origin = self.origin.lock().clone();
        self.assign(origin);
    }

    pub(crate) fn is_readonly(&self, property: &str) -> bool {
        self.core.is_prop(PolicyKind::Readonly, property)
    }

    pub(crate) fn is_disabled(&self, property: &str) -> bool {
        self.core.is_prop(PolicyKind::Disabled, property)
    }

    /// The property-change state machine.
    ///
    /// Offers `PropertyChanging` to the listener chain. A veto rolls the
    /// origin element back by re-rendering it against the committed state.
    /// Otherwise the value is written, observers are notified with
    /// `PropertyChanged`, and the listener chain is informed.
    pub(crate) fn handle_property_changing(&self, change: &PropertyChange) {
        let changing = ChangeEvent::PropertyChanging(change.clone());
        if self.core.dispatch(&changing) == Some(false) {
            tracing::debug!(
                target: TARGET,
                property = %change.property,
                "property change vetoed; rolling back origin element"
            );
            change.origin.notify(Some(&changing));
            return;
        }
        // The write is silent at every handler on the path; the changed
        // event below is the single notification for this commit. A write
        // that fails to land emits nothing.
        if !self.write_value_at(&change.property, change.value.clone()) {
            return;
        }
        let changed = ChangeEvent::PropertyChanged(PropertyChange {
            origin: change.origin.clone(),
            data: self.to_value(),
            property: change.property.clone(),
            value: change.value.clone(),
            index: change.index,
        });
        self.core.observable().notify_observers(Some(&changed));
        self.core.dispatch(&changed);
        // Items of an observed array surface their committed changes through
        // the array, so observers of the collection see item edits too.
        if let Some(parent) = self.core.parent().and_then(|p| p.as_array()) {
            parent.rebroadcast(&changed);
        }
    }
}

impl Observer for ObjectHandler {
    /// Reacts only to element-originated `PropertyChanging` requests; all
    /// other traffic on the mutual parent/child links is ignored here.
    fn update(&self, event: Option<&ChangeEvent>) {
        if let Some(ChangeEvent::PropertyChanging(change)) = event
            && change.origin.is_element()
        {
            self.handle_property_changing(change);
        }
    }
}

/// Split a dotted path into its first segment and the remainder.
fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}
