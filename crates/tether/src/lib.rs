//! Declarative, attribute-driven two-way data binding.
//!
//! Plain data is wrapped into observable *surrogates*; document nodes carry
//! namespaced attributes naming what they bind to; a [`Binder`] scans the
//! document, materializes binding elements, and keeps both sides in sync.
//! Model mutations re-render the bound nodes, and user gestures flow back
//! into the model through vetoable `*-ing` events.
//!
//! ```
//! use serde_json::json;
//! use tether::{wrap, BindConfig, Binder, Context, Document, Value};
//!
//! let doc = Document::new();
//! let span = doc.create_element("span");
//! doc.set_attribute(span, "data-tether-bind", "user");
//! doc.set_attribute(span, "data-tether-property", "name");
//! doc.append_child(doc.root(), span);
//!
//! let user = wrap(Value::from(json!({"name": "ada"}))).unwrap();
//! let mut context = Context::new();
//! context.set("user", user.clone());
//!
//! let binder = Binder::new(doc.clone(), BindConfig::new());
//! binder.initialize(doc.root(), &context).unwrap();
//! assert_eq!(doc.text(span), "ada");
//!
//! // A model change re-renders the node.
//! user.as_object().unwrap().set("name", "grace");
//! assert_eq!(doc.text(span), "grace");
//! ```

mod binder;
mod config;
mod context;
mod dom;
mod element;
mod error;
mod expr;
mod format;
mod registry;

pub use binder::{Binder, BinderCore};
pub use config::{attrs, BindConfig};
pub use context::{Context, ContextValue};
pub use dom::{Document, Gesture, NodeId};
pub use element::{BindingElement, CustomElementFactory, CustomRenderer};
pub use error::{BindError, Result};
pub use expr::{Expr, ExprError};
pub use format::{DateFormat, Format, FormatError, NumberFormat, StringFormat};
pub use registry::{ElementFactory, ElementRegistry};

pub use tether_core::{
    wrap, ArraySurrogate, ChangeEvent, EventKind, ItemMove, ItemSelection, ObjectSurrogate,
    Observer, PropertyChange, Slot, Surrogate, Value, WrapSource,
};
