//! Surrogate handles and lifecycle.
//!
//! A *surrogate* is the observable stand-in for one plain object or array.
//! [`ObjectSurrogate`] and [`ArraySurrogate`] are cheap `Arc`-backed handles
//! over the interception handlers; [`Surrogate`] is their sum. [`wrap`] is
//! the single entry point for turning plain data into surrogates and is
//! idempotent: wrapping an existing surrogate returns it unchanged, identity
//! preserved.
//!
//! # Example
//!
//! ```
//! use tether_core::{wrap, Value};
//! use serde_json::json;
//!
//! let user = wrap(Value::from(json!({"name": "a", "tags": ["x"]}))).unwrap();
//! let user = user.as_object().unwrap();
//! user.set("name", "b");
//! assert_eq!(user.get("name"), Some(Value::String("b".into())));
//!
//! // Nested structured values are surrogates themselves.
//! let tags = user.array("tags").unwrap();
//! assert_eq!(tags.push(Value::from("y")), 2);
//! ```

use std::sync::{Arc, Weak};

use crate::array::ArrayHandler;
use crate::error::{Result, SurrogateError};
use crate::event::{ChangeEvent, EventKind, ItemMove, ItemSelection, PropertyChange};
use crate::object::ObjectHandler;
use crate::observable::{Observer, ObserverId};
use crate::value::Value;

/// One stored position inside a surrogate: a primitive leaf or a child
/// surrogate.
#[derive(Clone)]
pub enum Slot {
    /// A primitive value, stored as-is.
    Leaf(Value),
    /// A nested object, always wrapped.
    Object(ObjectSurrogate),
    /// A nested array, always wrapped.
    Array(ArraySurrogate),
}

impl Slot {
    /// Plain deep snapshot of the slot.
    pub fn to_value(&self) -> Value {
        match self {
            Slot::Leaf(value) => value.clone(),
            Slot::Object(child) => child.to_value(),
            Slot::Array(child) => child.to_value(),
        }
    }
}

/// Handle to an observed object.
///
/// Clones share the same underlying handler; `same` tests that identity.
#[derive(Clone)]
pub struct ObjectSurrogate(Arc<ObjectHandler>);

impl ObjectSurrogate {
    /// Create a surrogate over an empty object.
    pub fn new() -> Self {
        Self(ObjectHandler::new())
    }

    /// Wrap a `Value::Object`; other inputs yield an empty surrogate.
    /// Callers check the shape first.
    pub(crate) fn from_object_value(value: Value) -> Self {
        let surrogate = Self::new();
        surrogate.0.assign(value);
        surrogate.0.save();
        surrogate
    }

    pub(crate) fn handler(&self) -> &Arc<ObjectHandler> {
        &self.0
    }

    /// Whether two handles refer to the same underlying object.
    pub fn same(&self, other: &ObjectSurrogate) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Plain value of one property, `None` if absent.
    pub fn get(&self, property: &str) -> Option<Value> {
        self.0.slot(property).map(|slot| slot.to_value())
    }

    /// The slot for one property, exposing child surrogates.
    pub fn slot(&self, property: &str) -> Option<Slot> {
        self.0.slot(property)
    }

    /// The child object surrogate at `property`, if that is its shape.
    pub fn object(&self, property: &str) -> Option<ObjectSurrogate> {
        match self.0.slot(property) {
            Some(Slot::Object(child)) => Some(child),
            _ => None,
        }
    }

    /// The child array surrogate at `property`, if that is its shape.
    pub fn array(&self, property: &str) -> Option<ArraySurrogate> {
        match self.0.slot(property) {
            Some(Slot::Array(child)) => Some(child),
            _ => None,
        }
    }

    /// The property names, in stored order.
    pub fn keys(&self) -> Vec<String> {
        self.0.keys()
    }

    /// Store one property and notify observers once.
    ///
    /// Structured values are wrapped, so nested data handed in through
    /// `set` is observable like any other.
    pub fn set(&self, property: &str, value: impl Into<Value>) {
        self.0.set(property, value.into());
    }

    /// Plain value at a dotted path, `None` for missing segments.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        self.0.value_at(path)
    }

    /// Write at a dotted path. Returns `false` for missing or primitive
    /// intermediate segments.
    pub fn set_value_at(&self, path: &str, value: impl Into<Value>) -> bool {
        self.0.set_value_at(path, value.into())
    }

    /// Plain deep snapshot.
    pub fn to_value(&self) -> Value {
        self.0.to_value()
    }

    /// Merge a plain object in; see [`crate::object::ObjectHandler::assign`].
    pub fn assign(&self, value: impl Into<Value>) {
        self.0.assign(value.into());
    }

    /// Null leaves and clear children, one notification.
    pub fn clear(&self) {
        self.0.clear();
    }

    /// Snapshot the current state as the origin.
    pub fn save(&self) {
        self.0.save();
    }

    /// Re-assign the origin snapshot.
    pub fn reset(&self) {
        self.0.reset();
    }

    /// Set the blanket readonly flag, overwriting per-property flags.
    pub fn set_readonly_all(&self, readonly: bool) {
        self.0.core().set_all(crate::handler::PolicyKind::Readonly, readonly);
    }

    /// Set one property's readonly flag.
    pub fn set_readonly(&self, property: &str, readonly: bool) {
        self.0
            .core()
            .set_prop(crate::handler::PolicyKind::Readonly, property, readonly);
    }

    /// Effective readonly state for one property, parent flags included.
    pub fn is_readonly(&self, property: &str) -> bool {
        self.0.is_readonly(property)
    }

    /// Set the blanket disabled flag, overwriting per-property flags.
    pub fn set_disabled_all(&self, disabled: bool) {
        self.0.core().set_all(crate::handler::PolicyKind::Disabled, disabled);
    }

    /// Set one property's disabled flag.
    pub fn set_disabled(&self, property: &str, disabled: bool) {
        self.0
            .core()
            .set_prop(crate::handler::PolicyKind::Disabled, property, disabled);
    }

    /// Effective disabled state for one property, parent flags included.
    pub fn is_disabled(&self, property: &str) -> bool {
        self.0.is_disabled(property)
    }

    /// Register the single `PropertyChanging` listener, replacing any
    /// previous one. Return `Some(false)` to veto the change.
    pub fn on_property_changing<F>(&self, listener: F)
    where
        F: Fn(&PropertyChange) -> Option<bool> + Send + Sync + 'static,
    {
        self.0.core().dispatcher().set_listener(
            EventKind::PropertyChanging,
            Arc::new(move |event| match event {
                ChangeEvent::PropertyChanging(change) => listener(change),
                _ => None,
            }),
        );
    }

    /// Register the single `PropertyChanged` listener, replacing any
    /// previous one.
    pub fn on_property_changed<F>(&self, listener: F)
    where
        F: Fn(&PropertyChange) -> Option<bool> + Send + Sync + 'static,
    {
        self.0.core().dispatcher().set_listener(
            EventKind::PropertyChanged,
            Arc::new(move |event| match event {
                ChangeEvent::PropertyChanged(change) => listener(change),
                _ => None,
            }),
        );
    }

    /// Register an observer with the underlying handler.
    pub fn add_observer(&self, observer: Weak<dyn Observer>) -> ObserverId {
        self.0.core().observable().add_observer(observer)
    }

    /// Remove a previously registered observer.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.0.core().observable().remove_observer(id)
    }

    /// The underlying handler as an observer handle, for wiring an
    /// element's observable back to the data.
    pub fn as_observer(&self) -> Weak<dyn Observer> {
        Arc::downgrade(&self.0) as Weak<dyn Observer>
    }
}

impl Default for ObjectSurrogate {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an observed array.
///
/// Clones share the same underlying handler; `same` tests that identity.
#[derive(Clone)]
pub struct ArraySurrogate(Arc<ArrayHandler>);

impl ArraySurrogate {
    /// Create a surrogate over an empty array.
    pub fn new() -> Self {
        Self(ArrayHandler::new())
    }

    /// Wrap a `Value::Array`; other inputs yield an empty surrogate.
    /// Callers check the shape first.
    pub(crate) fn from_array_value(value: Value) -> Self {
        let surrogate = Self::new();
        surrogate.0.assign(value);
        surrogate.0.save();
        surrogate
    }

    pub(crate) fn handler(&self) -> &Arc<ArrayHandler> {
        &self.0
    }

    /// Whether two handles refer to the same underlying array.
    pub fn same(&self, other: &ArraySurrogate) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The number of items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the array has no items.
    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    /// Plain value of one item, `None` if out of range.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.item(index).map(|slot| slot.to_value())
    }

    /// The slot at one index, exposing child surrogates.
    pub fn item(&self, index: usize) -> Option<Slot> {
        self.0.item(index)
    }

    /// The item object surrogate at `index`, if that is its shape.
    pub fn object(&self, index: usize) -> Option<ObjectSurrogate> {
        match self.0.item(index) {
            Some(Slot::Object(child)) => Some(child),
            _ => None,
        }
    }

    /// Plain value at a dotted path starting with an index segment.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        self.0.value_at(path)
    }

    /// Insert items at `index`, one notification.
    pub fn insert_item(&self, index: usize, values: Vec<Value>) -> Result<()> {
        self.0.insert_item(index, values)
    }

    /// Delete up to `count` items at `index`, one notification.
    pub fn delete_item(&self, index: usize, count: usize) -> Result<Vec<Value>> {
        self.0.delete_item(index, count)
    }

    /// Append one item; returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        self.0.push(value.into())
    }

    /// Remove and return the last item.
    pub fn pop(&self) -> Option<Value> {
        self.0.pop()
    }

    /// Remove and return the first item.
    pub fn shift(&self) -> Option<Value> {
        self.0.shift()
    }

    /// Prepend items; returns the new length.
    pub fn unshift(&self, values: Vec<Value>) -> usize {
        self.0.unshift(values)
    }

    /// Replace a range; returns the removed items as plain values.
    pub fn splice(&self, start: usize, delete_count: usize, values: Vec<Value>) -> Vec<Value> {
        self.0.splice(start, delete_count, values)
    }

    /// Shorten the array to `len` items.
    pub fn truncate(&self, len: usize) {
        self.0.truncate(len)
    }

    /// Record the selected index and emit `ItemSelected`.
    pub fn select_item(&self, index: usize) -> Result<()> {
        self.0.select_item(index)
    }

    /// The most recently selected index.
    pub fn selected_item_index(&self) -> Option<usize> {
        self.0.selected_item_index()
    }

    /// Plain deep snapshot.
    pub fn to_value(&self) -> Value {
        self.0.to_value()
    }

    /// Merge a plain array in; see [`crate::array::ArrayHandler::assign`].
    pub fn assign(&self, value: impl Into<Value>) {
        self.0.assign(value.into());
    }

    /// Empty the array, one notification.
    pub fn clear(&self) {
        self.0.clear();
    }

    /// Snapshot the current state as the origin.
    pub fn save(&self) {
        self.0.save();
    }

    /// Re-assign the origin snapshot.
    pub fn reset(&self) {
        self.0.reset();
    }

    /// Set the blanket readonly flag for item properties.
    pub fn set_readonly_all(&self, readonly: bool) {
        self.0.core().set_all(crate::handler::PolicyKind::Readonly, readonly);
    }

    /// Set one item property's readonly flag; overrides the items' own
    /// per-property flags.
    pub fn set_readonly(&self, property: &str, readonly: bool) {
        self.0
            .core()
            .set_prop(crate::handler::PolicyKind::Readonly, property, readonly);
    }

    /// Set the blanket disabled flag for item properties.
    pub fn set_disabled_all(&self, disabled: bool) {
        self.0.core().set_all(crate::handler::PolicyKind::Disabled, disabled);
    }

    /// Set one item property's disabled flag; overrides the items' own
    /// per-property flags.
    pub fn set_disabled(&self, property: &str, disabled: bool) {
        self.0
            .core()
            .set_prop(crate::handler::PolicyKind::Disabled, property, disabled);
    }

    /// Register the single `ItemSelecting` listener. Return `Some(false)`
    /// to veto the selection.
    pub fn on_item_selecting<F>(&self, listener: F)
    where
        F: Fn(&ItemSelection) -> Option<bool> + Send + Sync + 'static,
    {
        self.0.core().dispatcher().set_listener(
            EventKind::ItemSelecting,
            Arc::new(move |event| match event {
                ChangeEvent::ItemSelecting(selection) => listener(selection),
                _ => None,
            }),
        );
    }

    /// Register the single `ItemSelected` listener.
    pub fn on_item_selected<F>(&self, listener: F)
    where
        F: Fn(&ItemSelection) -> Option<bool> + Send + Sync + 'static,
    {
        self.0.core().dispatcher().set_listener(
            EventKind::ItemSelected,
            Arc::new(move |event| match event {
                ChangeEvent::ItemSelected(selection) => listener(selection),
                _ => None,
            }),
        );
    }

    /// Register the single `ItemMoving` listener. Return `Some(false)` to
    /// veto the move.
    pub fn on_item_moving<F>(&self, listener: F)
    where
        F: Fn(&ItemMove) -> Option<bool> + Send + Sync + 'static,
    {
        self.0.core().dispatcher().set_listener(
            EventKind::ItemMoving,
            Arc::new(move |event| match event {
                ChangeEvent::ItemMoving(mv) => listener(mv),
                _ => None,
            }),
        );
    }

    /// Register the single `ItemMoved` listener.
    pub fn on_item_moved<F>(&self, listener: F)
    where
        F: Fn(&ItemMove) -> Option<bool> + Send + Sync + 'static,
    {
        self.0.core().dispatcher().set_listener(
            EventKind::ItemMoved,
            Arc::new(move |event| match event {
                ChangeEvent::ItemMoved(mv) => listener(mv),
                _ => None,
            }),
        );
    }

    /// Register the single `PropertyChanging` listener. Item-object
    /// changes reach it through the dispatcher chain. Return `Some(false)`
    /// to veto.
    pub fn on_property_changing<F>(&self, listener: F)
    where
        F: Fn(&PropertyChange) -> Option<bool> + Send + Sync + 'static,
    {
        self.0.core().dispatcher().set_listener(
            EventKind::PropertyChanging,
            Arc::new(move |event| match event {
                ChangeEvent::PropertyChanging(change) => listener(change),
                _ => None,
            }),
        );
    }

    /// Register the single `PropertyChanged` listener for item-object
    /// changes.
    pub fn on_property_changed<F>(&self, listener: F)
    where
        F: Fn(&PropertyChange) -> Option<bool> + Send + Sync + 'static,
    {
        self.0.core().dispatcher().set_listener(
            EventKind::PropertyChanged,
            Arc::new(move |event| match event {
                ChangeEvent::PropertyChanged(change) => listener(change),
                _ => None,
            }),
        );
    }

    /// Register an observer with the underlying handler.
    pub fn add_observer(&self, observer: Weak<dyn Observer>) -> ObserverId {
        self.0.core().observable().add_observer(observer)
    }

    /// Remove a previously registered observer.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.0.core().observable().remove_observer(id)
    }

    /// The underlying handler as an observer handle, for wiring an
    /// element's observable back to the data.
    pub fn as_observer(&self) -> Weak<dyn Observer> {
        Arc::downgrade(&self.0) as Weak<dyn Observer>
    }
}

impl Default for ArraySurrogate {
    fn default() -> Self {
        Self::new()
    }
}

/// Either kind of surrogate handle.
#[derive(Clone)]
pub enum Surrogate {
    /// An observed object.
    Object(ObjectSurrogate),
    /// An observed array.
    Array(ArraySurrogate),
}

impl Surrogate {
    /// The object handle, if that is the shape.
    pub fn as_object(&self) -> Option<&ObjectSurrogate> {
        match self {
            Surrogate::Object(surrogate) => Some(surrogate),
            Surrogate::Array(_) => None,
        }
    }

    /// The array handle, if that is the shape.
    pub fn as_array(&self) -> Option<&ArraySurrogate> {
        match self {
            Surrogate::Array(surrogate) => Some(surrogate),
            Surrogate::Object(_) => None,
        }
    }

    /// Plain deep snapshot.
    pub fn to_value(&self) -> Value {
        match self {
            Surrogate::Object(surrogate) => surrogate.to_value(),
            Surrogate::Array(surrogate) => surrogate.to_value(),
        }
    }

    /// Merge plain data in, shape-wise.
    pub fn assign(&self, value: impl Into<Value>) {
        match self {
            Surrogate::Object(surrogate) => surrogate.assign(value),
            Surrogate::Array(surrogate) => surrogate.assign(value),
        }
    }

    /// Clear content with a single notification.
    pub fn clear(&self) {
        match self {
            Surrogate::Object(surrogate) => surrogate.clear(),
            Surrogate::Array(surrogate) => surrogate.clear(),
        }
    }

    /// Snapshot the current state as the origin.
    pub fn save(&self) {
        match self {
            Surrogate::Object(surrogate) => surrogate.save(),
            Surrogate::Array(surrogate) => surrogate.save(),
        }
    }

    /// Re-assign the origin snapshot.
    pub fn reset(&self) {
        match self {
            Surrogate::Object(surrogate) => surrogate.reset(),
            Surrogate::Array(surrogate) => surrogate.reset(),
        }
    }

    /// Register an observer with the underlying handler.
    pub fn add_observer(&self, observer: Weak<dyn Observer>) -> ObserverId {
        match self {
            Surrogate::Object(surrogate) => surrogate.add_observer(observer),
            Surrogate::Array(surrogate) => surrogate.add_observer(observer),
        }
    }
}

impl From<ObjectSurrogate> for Surrogate {
    fn from(surrogate: ObjectSurrogate) -> Self {
        Surrogate::Object(surrogate)
    }
}

impl From<ArraySurrogate> for Surrogate {
    fn from(surrogate: ArraySurrogate) -> Self {
        Surrogate::Array(surrogate)
    }
}

/// Input accepted by [`wrap`]: plain data or an existing surrogate.
pub enum WrapSource {
    /// Plain data to wrap.
    Plain(Value),
    /// An already-wrapped surrogate, returned as-is.
    Wrapped(Surrogate),
}

impl From<Value> for WrapSource {
    fn from(value: Value) -> Self {
        WrapSource::Plain(value)
    }
}

impl From<serde_json::Value> for WrapSource {
    fn from(value: serde_json::Value) -> Self {
        WrapSource::Plain(Value::from(value))
    }
}

impl From<Surrogate> for WrapSource {
    fn from(surrogate: Surrogate) -> Self {
        WrapSource::Wrapped(surrogate)
    }
}

impl From<ObjectSurrogate> for WrapSource {
    fn from(surrogate: ObjectSurrogate) -> Self {
        WrapSource::Wrapped(Surrogate::Object(surrogate))
    }
}

impl From<ArraySurrogate> for WrapSource {
    fn from(surrogate: ArraySurrogate) -> Self {
        WrapSource::Wrapped(Surrogate::Array(surrogate))
    }
}

/// Turn plain structured data into a surrogate tree.
///
/// Idempotent: an input that is already a surrogate is returned with its
/// identity (and any registered listeners and observers) intact. Primitive
/// inputs are an error; only objects and arrays are observable.
///
/// Every structured value nested in the input is wrapped as well, with its
/// parent link, mutual observation, and dispatcher chain in place. The
/// fresh surrogate's origin snapshot is taken at construction, so `reset`
/// restores the initial data.
pub fn wrap(source: impl Into<WrapSource>) -> Result<Surrogate> {
    match source.into() {
        WrapSource::Wrapped(surrogate) => Ok(surrogate),
        WrapSource::Plain(value @ Value::Object(_)) => Ok(Surrogate::Object(
            ObjectSurrogate::from_object_value(value),
        )),
        WrapSource::Plain(value @ Value::Array(_)) => {
            Ok(Surrogate::Array(ArraySurrogate::from_array_value(value)))
        }
        WrapSource::Plain(other) => Err(SurrogateError::NotStructured { kind: other.kind() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventOrigin;
    use crate::observable::Observable;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Records every update it receives, as the event kind (or None).
    struct Recorder {
        log: Arc<StdMutex<Vec<Option<EventKind>>>>,
    }

    impl Observer for Recorder {
        fn update(&self, event: Option<&ChangeEvent>) {
            self.log.lock().unwrap().push(event.map(ChangeEvent::kind));
        }
    }

    fn recorder() -> (Arc<Recorder>, Arc<StdMutex<Vec<Option<EventKind>>>>) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        (Arc::new(Recorder { log: Arc::clone(&log) }), log)
    }

    fn wrap_object(json: serde_json::Value) -> ObjectSurrogate {
        match wrap(json).unwrap() {
            Surrogate::Object(surrogate) => surrogate,
            Surrogate::Array(_) => panic!("expected object"),
        }
    }

    fn wrap_array(json: serde_json::Value) -> ArraySurrogate {
        match wrap(json).unwrap() {
            Surrogate::Array(surrogate) => surrogate,
            Surrogate::Object(_) => panic!("expected array"),
        }
    }

    /// Raise an element-originated event the way a bound element would:
    /// through an observable the handler observes.
    fn raise_from_element(target: Weak<dyn Observer>, event: ChangeEvent) {
        let observable = Observable::new();
        observable.add_observer(target);
        observable.notify_observers(Some(&event));
    }

    #[test]
    fn test_wrap_primitive_is_error() {
        assert_eq!(
            wrap(Value::Int(5)).err(),
            Some(SurrogateError::NotStructured { kind: "integer" })
        );
        assert_eq!(
            wrap(Value::Null).err(),
            Some(SurrogateError::NotStructured { kind: "null" })
        );
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let first = wrap_object(json!({"a": 1}));
        let again = wrap(first.clone()).unwrap();
        assert!(again.as_object().unwrap().same(&first));
    }

    #[test]
    fn test_nested_values_are_surrogates() {
        let user = wrap_object(json!({"name": "a", "address": {"city": "x"}, "tags": [1, 2]}));
        assert!(user.object("address").is_some());
        assert!(user.array("tags").is_some());
        assert_eq!(user.value_at("address.city"), Some(Value::String("x".into())));
    }

    #[test]
    fn test_set_wraps_structured_values() {
        let user = wrap_object(json!({}));
        user.set("address", Value::from(json!({"city": "x"})));
        let address = user.object("address").unwrap();
        assert_eq!(address.get("city"), Some(Value::String("x".into())));
    }

    #[test]
    fn test_set_notifies_once_with_changed_event() {
        let user = wrap_object(json!({"name": "a"}));
        let (observer, log) = recorder();
        user.add_observer(Arc::downgrade(&observer) as _);
        user.set("name", "b");
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[Some(EventKind::PropertyChanged)]
        );
    }

    #[test]
    fn test_item_set_surfaces_through_array() {
        let rows = wrap_array(json!([{"id": 1}]));
        let (observer, log) = recorder();
        rows.add_observer(Arc::downgrade(&observer) as _);
        rows.object(0).unwrap().set("id", 2);
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[Some(EventKind::PropertyChanged)]
        );
    }

    #[test]
    fn test_assign_notifies_once_and_merges() {
        let user = wrap_object(json!({"name": "a", "address": {"city": "x"}}));
        let address_before = user.object("address").unwrap();
        let (observer, log) = recorder();
        user.add_observer(Arc::downgrade(&observer) as _);

        user.assign(Value::from(json!({"name": "b", "address": {"city": "y"}, "extra": 1})));

        // Exactly one top-level notification for the whole batch.
        assert_eq!(log.lock().unwrap().len(), 1);
        // Child identity preserved across the merge.
        let address_after = user.object("address").unwrap();
        assert!(address_after.same(&address_before));
        assert_eq!(address_after.get("city"), Some(Value::String("y".into())));
        assert_eq!(user.get("extra"), Some(Value::Int(1)));
        // Keys absent from the incoming data are untouched.
        assert_eq!(user.get("name"), Some(Value::String("b".into())));
    }

    #[test]
    fn test_clear_nulls_leaves_and_empties_arrays() {
        let user = wrap_object(json!({"name": "a", "tags": [1, 2], "address": {"city": "x"}}));
        let (observer, log) = recorder();
        user.add_observer(Arc::downgrade(&observer) as _);

        user.clear();

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(user.get("name"), Some(Value::Null));
        assert_eq!(user.array("tags").unwrap().len(), 0);
        assert_eq!(
            user.object("address").unwrap().get("city"),
            Some(Value::Null)
        );
    }

    #[test]
    fn test_save_reset_round_trip() {
        let user = wrap_object(json!({"name": "a", "address": {"city": "x"}}));
        let snapshot = user.to_value();
        user.set("name", "b");
        user.set_value_at("address.city", "y");
        user.reset();
        assert_eq!(user.to_value(), snapshot);
    }

    #[test]
    fn test_save_moves_reset_point() {
        let user = wrap_object(json!({"name": "a"}));
        user.set("name", "b");
        user.save();
        user.set("name", "c");
        user.reset();
        assert_eq!(user.get("name"), Some(Value::String("b".into())));
    }

    #[test]
    fn test_element_change_request_commits_and_notifies() {
        let user = wrap_object(json!({"name": "a"}));
        let (element, log) = recorder();
        user.add_observer(Arc::downgrade(&element) as _);

        let change = PropertyChange {
            origin: EventOrigin::element(Arc::downgrade(&element) as _, 1),
            data: user.to_value(),
            property: "name".into(),
            value: Value::String("b".into()),
            index: None,
        };
        raise_from_element(user.as_observer(), ChangeEvent::PropertyChanging(change));

        assert_eq!(user.get("name"), Some(Value::String("b".into())));
        // The commit surfaced as exactly one changed event.
        let log = log.lock().unwrap();
        assert_eq!(log.as_slice(), &[Some(EventKind::PropertyChanged)]);
    }

    #[test]
    fn test_dotted_change_request_notifies_once() {
        let user = wrap_object(json!({"address": {"city": "x"}}));
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_in = Arc::clone(&seen);
        user.on_property_changed(move |change| {
            seen_in.lock().unwrap().push(change.property.clone());
            None
        });

        let (element, _) = recorder();
        let change = PropertyChange {
            origin: EventOrigin::element(Arc::downgrade(&element) as _, 1),
            data: user.to_value(),
            property: "address.city".into(),
            value: Value::String("y".into()),
            index: None,
        };
        raise_from_element(user.as_observer(), ChangeEvent::PropertyChanging(change));

        assert_eq!(user.value_at("address.city"), Some(Value::String("y".into())));
        // The delegated leaf write stays silent; exactly one changed event
        // reaches the listener, named by the full path.
        assert_eq!(seen.lock().unwrap().as_slice(), &["address.city".to_string()]);
    }

    #[test]
    fn test_unwritable_change_request_emits_nothing() {
        let user = wrap_object(json!({"name": "ada"}));
        let (observer, log) = recorder();
        user.add_observer(Arc::downgrade(&observer) as _);
        let fired = Arc::new(StdMutex::new(0));
        let fired_in = Arc::clone(&fired);
        user.on_property_changed(move |_| {
            *fired_in.lock().unwrap() += 1;
            None
        });

        let (element, _) = recorder();
        let change = PropertyChange {
            origin: EventOrigin::element(Arc::downgrade(&element) as _, 1),
            data: user.to_value(),
            property: "name.first".into(),
            value: Value::String("Ada".into()),
            index: None,
        };
        raise_from_element(user.as_observer(), ChangeEvent::PropertyChanging(change));

        // The intermediate segment is a primitive, so nothing was written
        // and no commit may be announced.
        assert_eq!(user.value_at("name.first"), None);
        assert_eq!(*fired.lock().unwrap(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_vetoed_change_rolls_back_origin() {
        let user = wrap_object(json!({"name": "a"}));
        user.on_property_changing(|_| Some(false));
        let (element, log) = recorder();

        let change = PropertyChange {
            origin: EventOrigin::element(Arc::downgrade(&element) as _, 1),
            data: user.to_value(),
            property: "name".into(),
            value: Value::String("b".into()),
            index: None,
        };
        raise_from_element(user.as_observer(), ChangeEvent::PropertyChanging(change));

        // Not committed; the origin element was told to re-render.
        assert_eq!(user.get("name"), Some(Value::String("a".into())));
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[Some(EventKind::PropertyChanging)]
        );
    }

    #[test]
    fn test_parent_listener_sees_child_changes() {
        let user = wrap_object(json!({"address": {"city": "x"}}));
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_in = Arc::clone(&seen);
        user.on_property_changed(move |change| {
            seen_in.lock().unwrap().push(change.property.clone());
            None
        });

        let address = user.object("address").unwrap();
        let (element, _) = recorder();
        let change = PropertyChange {
            origin: EventOrigin::element(Arc::downgrade(&element) as _, 1),
            data: address.to_value(),
            property: "city".into(),
            value: Value::String("y".into()),
            index: None,
        };
        raise_from_element(address.as_observer(), ChangeEvent::PropertyChanging(change));

        assert_eq!(seen.lock().unwrap().as_slice(), &["city".to_string()]);
        assert_eq!(address.get("city"), Some(Value::String("y".into())));
    }

    #[test]
    fn test_assign_suspends_listener_dispatch() {
        let user = wrap_object(json!({"name": "a"}));
        let fired = Arc::new(StdMutex::new(0));
        let fired_in = Arc::clone(&fired);
        user.on_property_changed(move |_| {
            *fired_in.lock().unwrap() += 1;
            None
        });
        user.assign(Value::from(json!({"name": "b", "other": 1})));
        assert_eq!(*fired.lock().unwrap(), 0);
    }

    #[test]
    fn test_readonly_blanket_is_inherited() {
        let user = wrap_object(json!({"address": {"city": "x"}}));
        user.set_readonly_all(true);
        let address = user.object("address").unwrap();
        assert!(address.is_readonly("city"));
    }

    #[test]
    fn test_readonly_own_flag_overrides_inherited_blanket() {
        let user = wrap_object(json!({"address": {"city": "x"}}));
        user.set_readonly_all(true);
        let address = user.object("address").unwrap();
        address.set_readonly("city", false);
        assert!(!address.is_readonly("city"));
        assert!(address.is_readonly("street"));
    }

    #[test]
    fn test_array_per_property_flag_overrides_item_flag() {
        let rows = wrap_array(json!([{"done": false}]));
        let item = rows.object(0).unwrap();
        item.set_readonly("done", false);
        rows.set_readonly("done", true);
        assert!(item.is_readonly("done"));
    }

    #[test]
    fn test_set_readonly_all_overwrites_per_property_flags() {
        let user = wrap_object(json!({"name": "a"}));
        user.set_readonly("name", true);
        user.set_readonly_all(false);
        assert!(!user.is_readonly("name"));
    }

    #[test]
    fn test_disabled_is_tracked_separately() {
        let user = wrap_object(json!({"name": "a"}));
        user.set_disabled("name", true);
        assert!(user.is_disabled("name"));
        assert!(!user.is_readonly("name"));
    }

    #[test]
    fn test_array_structural_ops_notify_once() {
        let rows = wrap_array(json!([{"id": 1}]));
        let (observer, log) = recorder();
        rows.add_observer(Arc::downgrade(&observer) as _);

        rows.insert_item(1, vec![Value::from(json!({"id": 2})), Value::from(json!({"id": 3}))])
            .unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(rows.len(), 3);

        rows.delete_item(0, 2).unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.value_at("0.id"), Some(Value::Int(3)));
    }

    #[test]
    fn test_array_insert_out_of_bounds() {
        let rows = wrap_array(json!([]));
        assert_eq!(
            rows.insert_item(1, vec![Value::Int(1)]).err(),
            Some(SurrogateError::IndexOutOfBounds { index: 1, len: 0 })
        );
    }

    #[test]
    fn test_array_push_pop_shift_unshift() {
        let tags = wrap_array(json!(["b"]));
        assert_eq!(tags.push("c"), 2);
        assert_eq!(tags.unshift(vec!["a".into()]), 3);
        assert_eq!(tags.shift(), Some(Value::String("a".into())));
        assert_eq!(tags.pop(), Some(Value::String("c".into())));
        assert_eq!(tags.to_value(), Value::from(json!(["b"])));
        // Popping an empty array neither notifies nor fails.
        tags.pop();
        assert_eq!(tags.pop(), None);
    }

    #[test]
    fn test_array_truncate_models_length_assignment() {
        let rows = wrap_array(json!([1, 2, 3]));
        let (observer, log) = recorder();
        rows.add_observer(Arc::downgrade(&observer) as _);
        rows.truncate(1);
        assert_eq!(rows.len(), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
        // Truncating past the end is a no-op and stays silent.
        rows.truncate(5);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_array_items_are_wrapped() {
        let rows = wrap_array(json!([{"id": 1}]));
        rows.push(Value::from(json!({"id": 2})));
        assert!(rows.object(0).is_some());
        assert!(rows.object(1).is_some());
    }

    #[test]
    fn test_select_item_records_and_notifies() {
        let rows = wrap_array(json!(["a", "b"]));
        let (observer, log) = recorder();
        rows.add_observer(Arc::downgrade(&observer) as _);
        rows.select_item(1).unwrap();
        assert_eq!(rows.selected_item_index(), Some(1));
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[Some(EventKind::ItemSelected)]
        );
        assert_eq!(
            rows.select_item(5).err(),
            Some(SurrogateError::IndexOutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_element_selection_request_honors_veto() {
        let rows = wrap_array(json!(["a", "b"]));
        rows.on_item_selecting(|selection| Some(selection.index != 1));
        let (element, _) = recorder();

        let selecting = |index| {
            ChangeEvent::ItemSelecting(ItemSelection {
                origin: EventOrigin::element(Arc::downgrade(&element) as _, 1),
                data: rows.to_value(),
                index,
            })
        };
        raise_from_element(rows.as_observer(), selecting(1));
        assert_eq!(rows.selected_item_index(), None);
        raise_from_element(rows.as_observer(), selecting(0));
        assert_eq!(rows.selected_item_index(), Some(0));
    }

    #[test]
    fn test_element_move_request_reorders_without_rewrap() {
        let rows = wrap_array(json!([{"id": 1}, {"id": 2}, {"id": 3}]));
        let first = rows.object(0).unwrap();
        let (element, _) = recorder();

        let mv = ChangeEvent::ItemMoving(ItemMove {
            origin: EventOrigin::element(Arc::downgrade(&element) as _, 1),
            data: rows.to_value(),
            from_index: 0,
            to_index: 2,
        });
        raise_from_element(rows.as_observer(), mv);

        assert_eq!(rows.value_at("2.id"), Some(Value::Int(1)));
        // The moved slot still holds the same surrogate.
        assert!(rows.object(2).unwrap().same(&first));
    }

    #[test]
    fn test_item_change_rebroadcasts_through_array() {
        let rows = wrap_array(json!([{"id": 1}]));
        let (array_observer, log) = recorder();
        rows.add_observer(Arc::downgrade(&array_observer) as _);

        let item = rows.object(0).unwrap();
        let (element, _) = recorder();
        let change = PropertyChange {
            origin: EventOrigin::element(Arc::downgrade(&element) as _, 1),
            data: item.to_value(),
            property: "id".into(),
            value: Value::Int(9),
            index: Some(0),
        };
        raise_from_element(item.as_observer(), ChangeEvent::PropertyChanging(change));

        assert!(
            log.lock()
                .unwrap()
                .contains(&Some(EventKind::PropertyChanged))
        );
        assert_eq!(rows.value_at("0.id"), Some(Value::Int(9)));
    }

    #[test]
    fn test_array_assign_preserves_matching_children() {
        let rows = wrap_array(json!([{"id": 1}, {"id": 2}]));
        let first = rows.object(0).unwrap();
        let (observer, log) = recorder();
        rows.add_observer(Arc::downgrade(&observer) as _);

        rows.assign(Value::from(json!([{"id": 10}, {"id": 20}, {"id": 30}])));
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(rows.len(), 3);
        assert!(rows.object(0).unwrap().same(&first));
        assert_eq!(rows.value_at("0.id"), Some(Value::Int(10)));

        rows.assign(Value::from(json!([{"id": 1}])));
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_array_reset_round_trip() {
        let rows = wrap_array(json!([{"id": 1}]));
        rows.push(Value::from(json!({"id": 2})));
        rows.delete_item(0, 1).unwrap();
        rows.reset();
        assert_eq!(rows.to_value(), Value::from(json!([{"id": 1}])));
    }

    #[test]
    fn test_splice_clamps_and_returns_removed() {
        let tags = wrap_array(json!(["a", "b", "c"]));
        let removed = tags.splice(1, 10, vec!["x".into()]);
        assert_eq!(removed, vec![Value::String("b".into()), Value::String("c".into())]);
        assert_eq!(tags.to_value(), Value::from(json!(["a", "x"])));
    }
}
