//! Plain structured data for Tether.
//!
//! [`Value`] is the interchange type between application data and the
//! surrogate tree: applications hand the runtime plain values, the runtime
//! wraps the structured ones (objects and arrays) in observable surrogates
//! and stores the primitive ones as-is.
//!
//! `Value` converts to and from [`serde_json::Value`], so fixtures can be
//! written with the `json!` macro and data can be moved in and out of any
//! serde-backed transport.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A plain, unobserved data value.
///
/// Objects keep their entries in a `BTreeMap`, which gives deterministic
/// iteration order for bulk operations such as `assign` and `clear`.
/// Serializes untagged, so the serde representation is plain JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Keyed map of values.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Builds an object value from an iterator of entries.
    pub fn from_entries<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// A short name for the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Returns `true` if this is `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this is an object or an array.
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as an array slice.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Attempts to get the value as an object map.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// The display rendition used when a bound node shows this value
    /// without a format codec.
    ///
    /// `Null` renders as the empty string; structured values render as
    /// their JSON serialization.
    pub fn display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => {
                serde_json::Value::from(self.clone()).to_string()
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::from(n),
            Value::Float(n) => serde_json::Value::from(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let value = Value::from(json!({"name": "a", "tags": ["x", "y"], "count": 2}));
        let map = value.as_object().unwrap();
        assert_eq!(map["name"], Value::String("a".into()));
        assert_eq!(map["count"], Value::Int(2));
        assert_eq!(
            map["tags"],
            Value::Array(vec!["x".into(), "y".into()])
        );
    }

    #[test]
    fn test_json_round_trip() {
        let value = Value::from(json!({"a": {"b": [1, 2.5, null, true, "s"]}}));
        let back = Value::from(serde_json::Value::from(value.clone()));
        assert_eq!(value, back);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::Null.display_string(), "");
        assert_eq!(Value::Bool(true).display_string(), "true");
        assert_eq!(Value::Int(42).display_string(), "42");
        assert_eq!(Value::Float(1234.5).display_string(), "1234.5");
        assert_eq!(Value::String("hi".into()).display_string(), "hi");
    }

    #[test]
    fn test_from_entries() {
        let value = Value::from_entries([("index", Value::Int(0)), ("first", Value::Bool(true))]);
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["index"], Value::Int(0));
    }

    #[test]
    fn test_serde_representation_is_plain_json() {
        let value = Value::from(json!({"n": 1, "s": "x", "nested": [true, null]}));
        let serialized = serde_json::to_value(&value).unwrap();
        assert_eq!(serialized, json!({"n": 1, "s": "x", "nested": [true, null]}));
        let deserialized: Value = serde_json::from_value(serialized).unwrap();
        assert_eq!(deserialized, value);
    }

    #[test]
    fn test_is_structured() {
        assert!(Value::Array(vec![]).is_structured());
        assert!(Value::Object(Default::default()).is_structured());
        assert!(!Value::Int(1).is_structured());
        assert!(!Value::Null.is_structured());
    }
}
