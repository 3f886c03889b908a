//! Document initialization and gesture routing.
//!
//! [`Binder`] owns the bound elements of one document. [`Binder::initialize`]
//! scans a subtree for nodes carrying the namespaced bind attribute, resolves
//! each bind target in the context, and hands the node to the matching
//! element factory. A node whose binding fails is logged and skipped; the
//! rest of the scan proceeds.
//!
//! User input enters through [`Binder::dispatch_gesture`], which walks from
//! the gestured node up the ancestor chain offering the gesture to each bound
//! element until one consumes it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::config::{attrs, BindConfig};
use crate::context::Context;
use crate::dom::{Document, Gesture, NodeId};
use crate::element::BindingElement;
use crate::error::{BindError, Result};
use crate::registry::{ElementFactory, ElementRegistry};

const TARGET: &str = "tether::binder";

/// Shared binder state; elements hold a weak handle back to this.
pub struct BinderCore {
    document: Document,
    config: BindConfig,
    registry: RwLock<ElementRegistry>,
    elements: Mutex<HashMap<NodeId, Arc<dyn BindingElement>>>,
    /// Gesture routes: bound nodes plus array item roots, each pointing at
    /// the element that handles gestures there.
    gestures: Mutex<HashMap<NodeId, Weak<dyn BindingElement>>>,
    next_element_id: AtomicU64,
}

impl BinderCore {
    /// The bound document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The binder configuration.
    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    /// Scan `root` and its descendants, binding every node that carries the
    /// bind attribute and is not already initialized. Binding failures are
    /// logged and the node skipped.
    pub(crate) fn initialize_in(self: &Arc<Self>, root: NodeId, context: &Context) -> Result<()> {
        if !self.document.contains(root) {
            return Err(BindError::NodeMissing);
        }
        let bind_attr = self.config.attr(attrs::BIND);
        let id_attr = self.config.attr(attrs::ID);
        let mut nodes = vec![root];
        nodes.extend(self.document.descendants(root));
        for node in nodes {
            // The snapshot can contain nodes that an earlier binding in this
            // scan already claimed (a loop template and its subtree, say);
            // the marker on the claiming ancestor excludes them.
            if !self.document.contains(node) || self.is_marked(node, root, &id_attr) {
                continue;
            }
            let Some(name) = self.document.attribute(node, &bind_attr) else {
                continue;
            };
            if let Err(error) = self.bind_node(node, &name, context) {
                let tag = self.document.tag(node).unwrap_or_default();
                tracing::error!(
                    target: TARGET,
                    %error,
                    tag = %tag,
                    bind = %name,
                    context = ?context,
                    "failed to bind node, skipping"
                );
            }
        }
        Ok(())
    }

    /// Whether the node, or any ancestor below the scan root, carries the
    /// initialization marker. The root itself is exempt so that scans
    /// started inside an already-marked subtree (loop item roots) still
    /// reach their descendants.
    fn is_marked(&self, node: NodeId, root: NodeId, id_attr: &str) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == root && candidate != node {
                return false;
            }
            if self.document.has_attribute(candidate, id_attr) {
                return true;
            }
            current = self.document.parent(candidate);
        }
        false
    }

    fn bind_node(self: &Arc<Self>, node: NodeId, name: &str, context: &Context) -> Result<()> {
        let entry = context
            .resolve(name)
            .ok_or_else(|| BindError::BindingNotFound {
                name: name.to_string(),
            })?;
        let data = entry.as_surrogate().ok_or_else(|| BindError::NotBindable {
            name: name.to_string(),
        })?;
        let tag = self.document.tag(node).ok_or(BindError::NodeMissing)?;
        let factory = self.registry.read().factory_for(&tag, &data);

        // Mark before creating: array templates are cloned with the marker
        // in place, so materialized item roots are never re-bound.
        let id = self.next_element_id.fetch_add(1, Ordering::Relaxed);
        self.document
            .set_attribute(node, self.config.attr(attrs::ID), format!("t{id}"));

        let element = factory.create(self, node, data, context.child())?;
        element.render()?;
        self.gestures
            .lock()
            .insert(element.node(), Arc::downgrade(&element));
        self.elements.lock().insert(element.node(), element);
        tracing::debug!(target: TARGET, tag = %tag, bind = %name, "bound element");
        Ok(())
    }

    /// Route gestures landing inside `node` to `element`. Used by loop
    /// elements for their materialized item roots.
    pub(crate) fn register_gesture(&self, node: NodeId, element: Weak<dyn BindingElement>) {
        self.gestures.lock().insert(node, element);
    }

    /// Forget every element and gesture route inside `root`, inclusive.
    pub(crate) fn release_subtree(&self, root: NodeId) {
        let mut nodes = vec![root];
        nodes.extend(self.document.descendants(root));
        let mut elements = self.elements.lock();
        let mut gestures = self.gestures.lock();
        for node in &nodes {
            elements.remove(node);
            gestures.remove(node);
        }
    }
}

/// The public entry point of the binding runtime.
///
/// One binder serves one [`Document`]; several binders with different
/// configurations can coexist in a process.
pub struct Binder {
    core: Arc<BinderCore>,
}

impl Binder {
    /// A binder over `document` with the given configuration.
    pub fn new(document: Document, config: BindConfig) -> Self {
        Self {
            core: Arc::new(BinderCore {
                document,
                config,
                registry: RwLock::new(ElementRegistry::new()),
                elements: Mutex::new(HashMap::new()),
                gestures: Mutex::new(HashMap::new()),
                next_element_id: AtomicU64::new(0),
            }),
        }
    }

    /// The bound document.
    pub fn document(&self) -> &Document {
        self.core.document()
    }

    /// Register a custom element factory for one tag.
    pub fn register_element(&self, tag: impl Into<String>, factory: Arc<dyn ElementFactory>) {
        self.core.registry.write().register(tag, factory);
    }

    /// Bind everything under `root` against `context`.
    ///
    /// Nodes that fail to bind are logged and skipped; the error return is
    /// reserved for a dead `root`.
    pub fn initialize(&self, root: NodeId, context: &Context) -> Result<()> {
        self.core.initialize_in(root, context)
    }

    /// The element bound at `node`, if any.
    pub fn element_at(&self, node: NodeId) -> Option<Arc<dyn BindingElement>> {
        self.core.elements.lock().get(&node).cloned()
    }

    /// Release all bindings under `root`, inclusive. The document itself is
    /// left untouched.
    pub fn release(&self, root: NodeId) {
        self.core.release_subtree(root);
    }

    /// Inject a user gesture at `node`.
    ///
    /// The gesture is offered to the element at the node and then to each
    /// enclosing element up the ancestor chain until one consumes it.
    /// Returns whether any element did.
    pub fn dispatch_gesture(&self, node: NodeId, gesture: Gesture) -> Result<bool> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            let element = self.core.gestures.lock().get(&candidate).and_then(Weak::upgrade);
            if let Some(element) = element
                && element.handle_gesture(node, &gesture)?
            {
                tracing::trace!(target: TARGET, gesture = ?gesture, "gesture consumed");
                return Ok(true);
            }
            current = self.core.document.parent(candidate);
        }
        Ok(false)
    }
}
