//! Array interception handler.
//!
//! [`ArrayHandler`] is the observable stand-in for one plain array. There is
//! no raw index-assignment path: all structural mutation goes through the
//! named entry points (`insert_item`, `delete_item`, `push`, `pop`,
//! `shift`, `unshift`, `splice`, `truncate`), each of which issues exactly
//! one notification. Selection and reordering flow through the
//! `ItemSelecting`/`ItemMoving` state machines.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{Result, SurrogateError};
use crate::event::{ChangeEvent, EventOrigin, ItemMove, ItemSelection};
use crate::handler::{HandlerCore, ParentHandler};
use crate::observable::Observer;
use crate::surrogate::{ArraySurrogate, ObjectSurrogate, Slot};
use crate::value::Value;

const TARGET: &str = "tether_core::array";

/// Interception state for one observed array.
pub struct ArrayHandler {
    pub(crate) core: HandlerCore,
    weak_self: Weak<ArrayHandler>,
    items: Mutex<Vec<Slot>>,
    selected: Mutex<Option<usize>>,
    /// Deep plain snapshot taken by `save`, re-applied by `reset`.
    origin: Mutex<Value>,
}

impl ArrayHandler {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            core: HandlerCore::new(),
            weak_self: weak_self.clone(),
            items: Mutex::new(Vec::new()),
            selected: Mutex::new(None),
            origin: Mutex::new(Value::Array(Vec::new())),
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
                    .attach_parent(ParentHandler::Array(self.weak_self.clone()));
                Slot::Object(child)
            }
            Value::Array(_) => {
                let child = ArraySurrogate::from_array_value(value);
                child
                    .handler()
                    .attach_parent(ParentHandler::Array(self.weak_self.clone()));
                Slot::Array(child)
            }
            primitive => Slot::Leaf(primitive),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub(crate) fn item(&self, index: usize) -> Option<Slot> {
        self.items.lock().get(index).cloned()
    }

    pub(crate) fn selected_item_index(&self) -> Option<usize> {
        *self.selected.lock()
    }

    /// Plain deep snapshot of the array.
    pub(crate) fn to_value(&self) -> Value {
        let items = self.items.lock();
        Value::Array(items.iter().map(Slot::to_value).collect())
    }

    /// Read a plain value at a dotted path whose first segment is an index.
    pub(crate) fn value_at(&self, path: &str) -> Option<Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let index: usize = head.parse().ok()?;
        let slot = self.item(index)?;
        match rest {
            None => Some(slot.to_value()),
            Some(rest) => match slot {
                Slot::Object(child) => child.handler().value_at(rest),
                Slot::Array(child) => child.handler().value_at(rest),
                Slot::Leaf(_) => None,
            },
        }
    }

    /// Write a plain value at a dotted path whose first segment is an
    /// index. Only paths reaching into a child surrogate are writable; an
    /// array has no raw index-assignment path.
    pub(crate) fn set_value_at(&self, path: &str, value: Value) -> bool {
        let Some((head, rest)) = path.split_once('.') else {
            tracing::warn!(target: TARGET, path, "arrays have no direct index assignment");
            return false;
        };
        let Some(index) = head.parse::<usize>().ok() else {
            tracing::warn!(target: TARGET, path, segment = head, "expected an index segment");
            return false;
        };
        match self.item(index) {
            Some(Slot::Object(child)) => child.handler().set_value_at(rest, value),
            Some(Slot::Array(child)) => child.handler().set_value_at(rest, value),
            _ => {
                tracing::warn!(target: TARGET, path, index, "no child surrogate at index");
                false
            }
        }
    }

    /// Dotted write without notifying from this handler or any delegate;
    /// used while a commit's single changed event is pending elsewhere.
    pub(crate) fn write_value_at(&self, path: &str, value: Value) -> bool {
        let Some((head, rest)) = path.split_once('.') else {
            tracing::warn!(target: TARGET, path, "arrays have no direct index assignment");
            return false;
        };
        let Some(index) = head.parse::<usize>().ok() else {
            tracing::warn!(target: TARGET, path, segment = head, "expected an index segment");
            return false;
        };
        match self.item(index) {
            Some(Slot::Object(child)) => child.handler().write_value_at(rest, value),
            Some(Slot::Array(child)) => child.handler().write_value_at(rest, value),
            _ => {
                tracing::warn!(target: TARGET, path, index, "no child surrogate at index");
                false
            }
        }
    }

    /// Insert items at `index`, shifting the rest right. One notification.
    pub(crate) fn insert_item(&self, index: usize, values: Vec<Value>) -> Result<()> {
        {
            let len = self.len();
            if index > len {
                return Err(SurrogateError::IndexOutOfBounds { index, len });
            }
            let slots: Vec<Slot> = values.into_iter().map(|v| self.wrap_slot(v)).collect();
            let mut items = self.items.lock();
            items.splice(index..index, slots);
        }
        self.core.observable().notify_observers(None);
        Ok(())
    }

    /// Remove up to `count` items starting at `index`. One notification.
    /// Returns the removed items as plain values.
    pub(crate) fn delete_item(&self, index: usize, count: usize) -> Result<Vec<Value>> {
        let removed = {
            let mut items = self.items.lock();
            let len = items.len();
            if index > len {
                return Err(SurrogateError::IndexOutOfBounds { index, len });
            }
            let end = (index + count).min(len);
            items
                .drain(index..end)
                .map(|slot| slot.to_value())
                .collect()
        };
        self.core.observable().notify_observers(None);
        Ok(removed)
    }

    /// Append one item. Returns the new length.
    pub(crate) fn push(&self, value: Value) -> usize {
        let len = {
            let slot = self.wrap_slot(value);
            let mut items = self.items.lock();
            items.push(slot);
            items.len()
        };
        self.core.observable().notify_observers(None);
        len
    }

    /// Remove and return the last item, if any.
    pub(crate) fn pop(&self) -> Option<Value> {
        let removed = self.items.lock().pop().map(|slot| slot.to_value());
        if removed.is_some() {
            self.core.observable().notify_observers(None);
        }
        removed
    }

    /// Remove and return the first item, if any.
    pub(crate) fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.items.lock();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0).to_value())
            }
        };
        if removed.is_some() {
            self.core.observable().notify_observers(None);
        }
        removed
    }

    /// Prepend items. Returns the new length.
    pub(crate) fn unshift(&self, values: Vec<Value>) -> usize {
        let len = {
            let slots: Vec<Slot> = values.into_iter().map(|v| self.wrap_slot(v)).collect();
            let mut items = self.items.lock();
            items.splice(0..0, slots);
            items.len()
        };
        self.core.observable().notify_observers(None);
        len
    }

    /// Remove `delete_count` items at `start` (both clamped) and insert
    /// replacements there. One notification. Returns the removed items as
    /// plain values.
    pub(crate) fn splice(
        &self,
        start: usize,
        delete_count: usize,
        values: Vec<Value>,
    ) -> Vec<Value> {
        let removed = {
            let slots: Vec<Slot> = values.into_iter().map(|v| self.wrap_slot(v)).collect();
            let mut items = self.items.lock();
            let start = start.min(items.len());
            let end = (start + delete_count).min(items.len());
            items
                .splice(start..end, slots)
                .map(|slot| slot.to_value())
                .collect()
        };
        self.core.observable().notify_observers(None);
        removed
    }

    /// Shorten the array, the moral equivalent of assigning `length`.
    pub(crate) fn truncate(&self, len: usize) {
        let changed = {
            let mut items = self.items.lock();
            if len < items.len() {
                items.truncate(len);
                true
            } else {
                false
            }
        };
        if changed {
            self.core.observable().notify_observers(None);
        }
    }

    /// Record the selected index and emit `ItemSelected`.
    ///
    /// Selection changes no content and no order; observers toggle
    /// selection styling without re-rendering item content.
    pub(crate) fn select_item(&self, index: usize) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(SurrogateError::IndexOutOfBounds { index, len });
        }
        *self.selected.lock() = Some(index);
        let selected = ChangeEvent::ItemSelected(ItemSelection {
            origin: EventOrigin::internal(),
            data: self.to_value(),
            index,
        });
        self.core.observable().notify_observers(Some(&selected));
        Ok(())
    }

    /// Merge a plain array into the existing items.
    ///
    /// Matching-shape children at the same index are assigned into
    /// recursively (identity and listeners preserved); other positions are
    /// replaced by a fresh wrap; trailing items are dropped. Exactly one
    /// coarse notification at the end.
    pub(crate) fn assign(&self, value: Value) {
        {
            let _suspended = self.core.suspend_all();
            if let Value::Array(incoming) = value {
                let new_len = incoming.len();
                for (index, entry) in incoming.into_iter().enumerate() {
                    self.merge_index(index, entry);
                }
                self.items.lock().truncate(new_len);
            }
        }
        self.core.observable().notify_observers(None);
    }

    fn merge_index(&self, index: usize, value: Value) {
        let existing = self.items.lock().get(index).cloned();
        match (existing, value) {
            (Some(Slot::Object(child)), value @ Value::Object(_)) => {
                child.handler().assign(value);
            }
            (Some(Slot::Array(child)), value @ Value::Array(_)) => {
                child.handler().assign(value);
            }
            (Some(_), value) => {
                let slot = self.wrap_slot(value);
                self.items.lock()[index] = slot;
            }
            (None, value) => {
                let slot = self.wrap_slot(value);
                self.items.lock().push(slot);
            }
        }
    }

    /// Empty the array with a single notification.
    pub(crate) fn clear(&self) {
        {
            let _suspended = self.core.suspend_all();
            self.items.lock().clear();
            *self.selected.lock() = None;
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

    /// The selection state machine for element-originated requests.
    fn handle_item_selecting(&self, selection: &ItemSelection) {
        let selecting = ChangeEvent::ItemSelecting(selection.clone());
        if self.core.dispatch(&selecting) == Some(false) {
            tracing::debug!(target: TARGET, index = selection.index, "item selection vetoed");
            return;
        }
        *self.selected.lock() = Some(selection.index);
        let selected = ChangeEvent::ItemSelected(ItemSelection {
            origin: selection.origin.clone(),
            data: self.to_value(),
            index: selection.index,
        });
        self.core.observable().notify_observers(Some(&selected));
        self.core.dispatch(&selected);
    }

    /// The reorder state machine for element-originated requests.
    ///
    /// The item is spliced directly; child surrogates move with their slot
    /// and are not re-wrapped.
    fn handle_item_moving(&self, mv: &ItemMove) {
        let moving = ChangeEvent::ItemMoving(mv.clone());
        if self.core.dispatch(&moving) == Some(false) {
            tracing::debug!(
                target: TARGET,
                from = mv.from_index,
                to = mv.to_index,
                "item move vetoed"
            );
            return;
        }
        {
            let mut items = self.items.lock();
            if mv.from_index >= items.len() || mv.to_index >= items.len() {
                tracing::warn!(
                    target: TARGET,
                    from = mv.from_index,
                    to = mv.to_index,
                    len = items.len(),
                    "item move out of bounds; ignored"
                );
                return;
            }
            let slot = items.remove(mv.from_index);
            items.insert(mv.to_index, slot);
        }
        let moved = ChangeEvent::ItemMoved(ItemMove {
            origin: mv.origin.clone(),
            data: self.to_value(),
            from_index: mv.from_index,
            to_index: mv.to_index,
        });
        self.core.observable().notify_observers(Some(&moved));
        self.core.dispatch(&moved);
    }

    /// Forward a committed property change of an item object to this
    /// array's observers.
    pub(crate) fn rebroadcast(&self, event: &ChangeEvent) {
        self.core.observable().notify_observers(Some(event));
    }
}

impl Observer for ArrayHandler {
    /// Reacts only to element-originated selection and move requests;
    /// other traffic on the mutual parent/child links is ignored here.
    fn update(&self, event: Option<&ChangeEvent>) {
        match event {
            Some(ChangeEvent::ItemSelecting(selection)) if selection.origin.is_element() => {
                self.handle_item_selecting(selection);
            }
            Some(ChangeEvent::ItemMoving(mv)) if mv.origin.is_element() => {
                self.handle_item_moving(mv);
            }
            _ => {}
        }
    }
}
