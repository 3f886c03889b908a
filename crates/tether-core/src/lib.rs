//! Core systems for Tether.
//!
//! This crate provides the data side of the Tether binding runtime:
//!
//! - **Observable/Observer**: ordered synchronous notification with a
//!   suspend/resume gate
//! - **Events**: immutable change-event objects and the listener dispatch
//!   chain with veto aggregation
//! - **Interception layer**: object and array handlers that stand in for
//!   plain data and run the change/selection/move state machines
//! - **Surrogates**: the `wrap`/`assign`/`clear`/`save`/`reset` lifecycle
//!   over plain [`Value`] data
//!
//! The UI side (document tree, binding elements, formats, expressions, the
//! initializer) lives in the `tether` crate.
//!
//! # Example
//!
//! ```
//! use tether_core::{wrap, Value};
//! use serde_json::json;
//!
//! use std::sync::{Arc, Mutex};
//!
//! let data = wrap(Value::from(json!({"user": {"name": "a"}, "tags": ["x"]}))).unwrap();
//! let root = data.as_object().unwrap();
//!
//! // A listener on the root sees committed changes from the whole subtree.
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = Arc::clone(&seen);
//! root.on_property_changed(move |change| {
//!     log.lock().unwrap().push(change.property.clone());
//!     None
//! });
//!
//! root.set_value_at("user.name", "b");
//! assert_eq!(root.value_at("user.name"), Some(Value::String("b".into())));
//! assert_eq!(seen.lock().unwrap().as_slice(), &["name".to_string()]);
//! ```

mod array;
mod error;
mod event;
mod handler;
pub mod logging;
mod object;
mod observable;
mod surrogate;
mod value;

pub use error::{Result, SurrogateError};
pub use event::{
    ChangeEvent, EventDispatcher, EventKind, EventListener, EventOrigin, ItemMove, ItemSelection,
    PropertyChange,
};
pub use logging::SurrogateTreeDebug;
pub use observable::{NotifySuspension, Observable, Observer, ObserverId};
pub use surrogate::{wrap, ArraySurrogate, ObjectSurrogate, Slot, Surrogate, WrapSource};
pub use value::Value;
