//! Application-defined element kinds.
//!
//! A [`CustomRenderer`] takes over content rendering for nodes of one tag
//! while the runtime keeps handling the `if` guard, the `execute` epilogue,
//! observation and descendant initialization.

use std::sync::{Arc, Weak};

use tether_core::{ChangeEvent, Observer, Surrogate};

use crate::binder::BinderCore;
use crate::config::attrs;
use crate::context::Context;
use crate::dom::{Document, Gesture, NodeId};
use crate::element::{BindingElement, ElementBase};
use crate::error::Result;
use crate::expr::Expr;
use crate::registry::ElementFactory;

const TARGET: &str = "tether::element";

/// Renders the content of a custom element from the bound data.
pub trait CustomRenderer: Send + Sync {
    /// Write the current model state into the node's subtree.
    fn render(
        &self,
        document: &Document,
        node: NodeId,
        data: &Surrogate,
        context: &Context,
    ) -> Result<()>;
}

/// An element whose content is produced by a [`CustomRenderer`].
pub struct CustomElement {
    base: ElementBase,
    data: Surrogate,
    renderer: Arc<dyn CustomRenderer>,
    guard: Option<Expr>,
    epilogue: Option<Expr>,
}

impl CustomElement {
    fn create(
        binder: &Arc<BinderCore>,
        node: NodeId,
        data: Surrogate,
        context: Context,
        renderer: Arc<dyn CustomRenderer>,
    ) -> Result<Arc<Self>> {
        let base = ElementBase::new(binder, node, context);
        let guard = base.expr_attr(attrs::IF)?;
        let epilogue = base.expr_attr(attrs::EXECUTE)?;
        let element = Arc::new(CustomElement {
            base,
            data,
            renderer,
            guard,
            epilogue,
        });
        let weak = Arc::downgrade(&element) as Weak<dyn Observer>;
        match &element.data {
            Surrogate::Object(surrogate) => {
                surrogate.add_observer(weak);
            }
            Surrogate::Array(surrogate) => {
                surrogate.add_observer(weak);
            }
        }
        Ok(element)
    }
}

impl BindingElement for CustomElement {
    fn node(&self) -> NodeId {
        self.base.node
    }

    fn render(&self) -> Result<()> {
        if !self.base.apply_guard(&self.guard)? {
            return Ok(());
        }
        self.renderer
            .render(&self.base.document, self.base.node, &self.data, &self.base.context)?;
        // Rendered content may itself carry binding attributes.
        let binder = self.base.binder()?;
        for child in self.base.document.children(self.base.node) {
            binder.initialize_in(child, &self.base.context)?;
        }
        self.base.run_epilogue(&self.epilogue)
    }

    fn handle_gesture(&self, _node: NodeId, _gesture: &Gesture) -> Result<bool> {
        Ok(false)
    }
}

impl Observer for CustomElement {
    fn update(&self, _event: Option<&ChangeEvent>) {
        if let Err(error) = self.render() {
            tracing::error!(target: TARGET, %error, "render failed after model change");
        }
    }
}

/// Factory producing custom elements for one registered tag.
pub struct CustomElementFactory {
    renderer: Arc<dyn CustomRenderer>,
}

impl CustomElementFactory {
    /// A factory wrapping one renderer.
    pub fn new(renderer: Arc<dyn CustomRenderer>) -> Self {
        Self { renderer }
    }
}

impl ElementFactory for CustomElementFactory {
    fn create(
        &self,
        binder: &Arc<BinderCore>,
        node: NodeId,
        data: Surrogate,
        context: Context,
    ) -> Result<Arc<dyn BindingElement>> {
        Ok(CustomElement::create(
            binder,
            node,
            data,
            context,
            Arc::clone(&self.renderer),
        )?)
    }
}
