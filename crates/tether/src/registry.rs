//! Element factories and tag registration.

use std::collections::HashMap;
use std::sync::Arc;

use tether_core::Surrogate;

use crate::binder::BinderCore;
use crate::context::Context;
use crate::dom::NodeId;
use crate::element::{ArrayElement, BindingElement, ObjectElement};
use crate::error::{BindError, Result};

/// Produces a bound element for a document node.
pub trait ElementFactory: Send + Sync {
    /// Build and wire an element over `node` bound to `data`.
    fn create(
        &self,
        binder: &Arc<BinderCore>,
        node: NodeId,
        data: Surrogate,
        context: Context,
    ) -> Result<Arc<dyn BindingElement>>;
}

struct ObjectElementFactory;

impl ElementFactory for ObjectElementFactory {
    fn create(
        &self,
        binder: &Arc<BinderCore>,
        node: NodeId,
        data: Surrogate,
        context: Context,
    ) -> Result<Arc<dyn BindingElement>> {
        match data {
            Surrogate::Object(data) => {
                Ok(ObjectElement::create(binder, node, data, context)? as Arc<dyn BindingElement>)
            }
            Surrogate::Array(_) => Err(BindError::NotBindable {
                name: binder.document().tag(node).unwrap_or_default(),
            }),
        }
    }
}

struct ArrayElementFactory;

impl ElementFactory for ArrayElementFactory {
    fn create(
        &self,
        binder: &Arc<BinderCore>,
        node: NodeId,
        data: Surrogate,
        context: Context,
    ) -> Result<Arc<dyn BindingElement>> {
        match data {
            Surrogate::Array(data) => {
                Ok(ArrayElement::create(binder, node, data, context)? as Arc<dyn BindingElement>)
            }
            Surrogate::Object(_) => Err(BindError::NotBindable {
                name: binder.document().tag(node).unwrap_or_default(),
            }),
        }
    }
}

/// Factory lookup: custom registrations by tag first, then the built-in
/// default for the data's shape.
pub struct ElementRegistry {
    by_tag: HashMap<String, Arc<dyn ElementFactory>>,
    default_object: Arc<dyn ElementFactory>,
    default_array: Arc<dyn ElementFactory>,
}

impl ElementRegistry {
    /// A registry with only the built-in object and array factories.
    pub fn new() -> Self {
        Self {
            by_tag: HashMap::new(),
            default_object: Arc::new(ObjectElementFactory),
            default_array: Arc::new(ArrayElementFactory),
        }
    }

    /// Register a factory for one tag, replacing any previous registration.
    pub fn register(&mut self, tag: impl Into<String>, factory: Arc<dyn ElementFactory>) {
        self.by_tag.insert(tag.into(), factory);
    }

    /// The factory for a node's tag and its data's shape.
    pub fn factory_for(&self, tag: &str, data: &Surrogate) -> Arc<dyn ElementFactory> {
        if let Some(factory) = self.by_tag.get(tag) {
            return Arc::clone(factory);
        }
        match data {
            Surrogate::Object(_) => Arc::clone(&self.default_object),
            Surrogate::Array(_) => Arc::clone(&self.default_array),
        }
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}
