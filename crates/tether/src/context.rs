//! Name resolution scopes.
//!
//! A [`Context`] maps names to data for one initialization pass. Array
//! elements derive per-item child scopes that add the item and loop-status
//! aliases on top of the surrounding names.
//!
//! Resolution is context-only: a name missing from the scope is unresolved,
//! full stop. There is no process-global fallback table.

use std::collections::HashMap;
use std::fmt;

use tether_core::{ArraySurrogate, ObjectSurrogate, Slot, Surrogate, Value};

/// One named entry in a context: a surrogate handle or a plain value.
#[derive(Clone)]
pub enum ContextValue {
    /// An observed object.
    Object(ObjectSurrogate),
    /// An observed array.
    Array(ArraySurrogate),
    /// A plain, unobserved value (loop status objects, constants).
    Value(Value),
}

impl ContextValue {
    /// Plain snapshot of the entry.
    pub fn to_value(&self) -> Value {
        match self {
            ContextValue::Object(surrogate) => surrogate.to_value(),
            ContextValue::Array(surrogate) => surrogate.to_value(),
            ContextValue::Value(value) => value.clone(),
        }
    }

    /// The entry as a surrogate, if it is one.
    pub fn as_surrogate(&self) -> Option<Surrogate> {
        match self {
            ContextValue::Object(surrogate) => Some(Surrogate::Object(surrogate.clone())),
            ContextValue::Array(surrogate) => Some(Surrogate::Array(surrogate.clone())),
            ContextValue::Value(_) => None,
        }
    }

    pub(crate) fn from_slot(slot: Slot) -> Self {
        match slot {
            Slot::Leaf(value) => ContextValue::Value(value),
            Slot::Object(surrogate) => ContextValue::Object(surrogate),
            Slot::Array(surrogate) => ContextValue::Array(surrogate),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ContextValue::Object(_) => "object",
            ContextValue::Array(_) => "array",
            ContextValue::Value(value) => value.kind(),
        }
    }
}

impl From<ObjectSurrogate> for ContextValue {
    fn from(surrogate: ObjectSurrogate) -> Self {
        ContextValue::Object(surrogate)
    }
}

impl From<ArraySurrogate> for ContextValue {
    fn from(surrogate: ArraySurrogate) -> Self {
        ContextValue::Array(surrogate)
    }
}

impl From<Surrogate> for ContextValue {
    fn from(surrogate: Surrogate) -> Self {
        match surrogate {
            Surrogate::Object(surrogate) => ContextValue::Object(surrogate),
            Surrogate::Array(surrogate) => ContextValue::Array(surrogate),
        }
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        ContextValue::Value(value)
    }
}

/// A name→value scope for binding and expression evaluation.
#[derive(Clone, Default)]
pub struct Context {
    vars: HashMap<String, ContextValue>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) {
        self.vars.insert(name.into(), value.into());
    }

    /// A child scope seeded with this scope's names.
    ///
    /// Entries are handle clones; shadowing a name in the child never
    /// touches the parent scope.
    pub fn child(&self) -> Context {
        self.clone()
    }

    /// Resolve a dotted path.
    ///
    /// The first segment is a scope name; later segments navigate object
    /// properties and array indices, crossing surrogate boundaries. `None`
    /// if any segment is missing.
    pub fn resolve(&self, path: &str) -> Option<ContextValue> {
        let mut segments = path.split('.');
        let mut current = self.vars.get(segments.next()?)?.clone();
        for segment in segments {
            current = match current {
                ContextValue::Object(surrogate) => {
                    ContextValue::from_slot(surrogate.slot(segment)?)
                }
                ContextValue::Array(surrogate) => {
                    let index: usize = segment.parse().ok()?;
                    ContextValue::from_slot(surrogate.item(index)?)
                }
                ContextValue::Value(Value::Object(map)) => {
                    ContextValue::Value(map.get(segment)?.clone())
                }
                ContextValue::Value(Value::Array(items)) => {
                    let index: usize = segment.parse().ok()?;
                    ContextValue::Value(items.get(index)?.clone())
                }
                ContextValue::Value(_) => return None,
            };
        }
        Some(current)
    }

    /// Resolve a dotted path to a plain value.
    pub fn resolve_value(&self, path: &str) -> Option<Value> {
        self.resolve(path).map(|entry| entry.to_value())
    }
}

impl fmt::Debug for Context {
    /// Lists the bound names and their kinds; used in binding-failure logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.vars.iter().collect();
        names.sort_by_key(|(name, _)| name.as_str());
        let mut map = f.debug_map();
        for (name, value) in names {
            map.entry(name, &value.kind());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_core::wrap;

    fn sample() -> Context {
        let data = wrap(Value::from(json!({
            "name": "a",
            "address": {"city": "x"},
            "tags": ["p", "q"],
        })))
        .unwrap();
        let mut context = Context::new();
        context.set("user", data);
        context.set("status", Value::from(json!({"index": 2, "first": false})));
        context
    }

    #[test]
    fn test_resolve_through_surrogates() {
        let context = sample();
        assert_eq!(
            context.resolve_value("user.name"),
            Some(Value::String("a".into()))
        );
        assert_eq!(
            context.resolve_value("user.address.city"),
            Some(Value::String("x".into()))
        );
        assert_eq!(
            context.resolve_value("user.tags.1"),
            Some(Value::String("q".into()))
        );
        assert!(matches!(
            context.resolve("user.address"),
            Some(ContextValue::Object(_))
        ));
    }

    #[test]
    fn test_resolve_plain_values() {
        let context = sample();
        assert_eq!(context.resolve_value("status.index"), Some(Value::Int(2)));
    }

    #[test]
    fn test_unresolved_paths() {
        let context = sample();
        assert!(context.resolve("missing").is_none());
        assert!(context.resolve("user.nope").is_none());
        assert!(context.resolve("user.name.deeper").is_none());
        assert!(context.resolve("user.tags.9").is_none());
    }

    #[test]
    fn test_child_scope_shadows_without_leaking() {
        let mut parent = sample();
        let mut child = parent.child();
        child.set("status", Value::from(json!({"index": 9})));
        assert_eq!(child.resolve_value("status.index"), Some(Value::Int(9)));
        assert_eq!(parent.resolve_value("status.index"), Some(Value::Int(2)));
        // And the child still sees the surrounding names.
        assert!(child.resolve("user.name").is_some());
        parent.set("extra", Value::Int(1));
        assert!(child.resolve("extra").is_none());
    }
}
