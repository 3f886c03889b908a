//! Binding elements.
//!
//! An element couples one document node to one surrogate. Object elements
//! render a single property as text; array elements materialize one subtree
//! clone per item. Both sides observe each other: the surrogate notifies the
//! element to re-render, and the element raises `*-ing` events at the
//! surrogate when the user edits, clicks or drags.

mod array_element;
mod custom;
mod object_element;

pub use array_element::ArrayElement;
pub use custom::{CustomElementFactory, CustomRenderer};
pub use object_element::ObjectElement;

use std::sync::{Arc, Weak};

use tether_core::{Observable, Observer};

use crate::binder::BinderCore;
use crate::config::{attrs, BindConfig};
use crate::context::Context;
use crate::dom::{Document, Gesture, NodeId};
use crate::error::{BindError, Result};
use crate::expr::Expr;

/// A document node bound to data.
///
/// `Observer` is the data-facing side: the surrogate calls `update` when the
/// model changes. The remaining methods are the binder-facing side.
pub trait BindingElement: Observer {
    /// The bound document node.
    fn node(&self) -> NodeId;

    /// Render the current model state into the document.
    fn render(&self) -> Result<()>;

    /// Handle a user gesture on `node` (the gestured node, which may be a
    /// descendant of the bound node). `Ok(true)` consumes the gesture;
    /// `Ok(false)` lets it bubble to enclosing elements.
    fn handle_gesture(&self, node: NodeId, gesture: &Gesture) -> Result<bool>;
}

/// State shared by every element kind.
pub(crate) struct ElementBase {
    pub(crate) binder: Weak<BinderCore>,
    pub(crate) document: Document,
    pub(crate) config: BindConfig,
    pub(crate) node: NodeId,
    pub(crate) context: Context,
    /// The element's own observable; surrogates subscribe here to receive
    /// the element's `*-ing` events.
    pub(crate) observable: Observable,
}

impl ElementBase {
    pub(crate) fn new(binder: &Arc<BinderCore>, node: NodeId, context: Context) -> Self {
        Self {
            binder: Arc::downgrade(binder),
            document: binder.document().clone(),
            config: binder.config().clone(),
            node,
            context,
            observable: Observable::new(),
        }
    }

    pub(crate) fn binder(&self) -> Result<Arc<BinderCore>> {
        self.binder.upgrade().ok_or(BindError::BinderDropped)
    }

    /// Read one namespaced attribute off the bound node.
    pub(crate) fn attr(&self, name: &str) -> Option<String> {
        self.document.attribute(self.node, &self.config.attr(name))
    }

    /// Parse an optional expression attribute (`if`, `execute`).
    pub(crate) fn expr_attr(&self, name: &str) -> Result<Option<Expr>> {
        match self.attr(name) {
            Some(source) => Ok(Some(Expr::parse(&source)?)),
            None => Ok(None),
        }
    }

    /// Evaluate the `if` guard and apply visibility. `Ok(true)` means the
    /// element is visible and should render its content.
    pub(crate) fn apply_guard(&self, guard: &Option<Expr>) -> Result<bool> {
        let visible = match guard {
            Some(expr) => expr.eval_truthy(&self.context)?,
            None => true,
        };
        self.document.set_hidden(self.node, !visible);
        Ok(visible)
    }

    /// Evaluate the `execute` epilogue, if present.
    pub(crate) fn run_epilogue(&self, epilogue: &Option<Expr>) -> Result<()> {
        if let Some(expr) = epilogue {
            expr.eval(&self.context)?;
        }
        Ok(())
    }

    /// The item index of the nearest enclosing materialized array item, read
    /// from the index attribute written at render time.
    pub(crate) fn item_index(&self) -> Option<usize> {
        let attr = self.config.attr(attrs::INDEX);
        let mut current = Some(self.node);
        while let Some(node) = current {
            if let Some(text) = self.document.attribute(node, &attr) {
                return text.parse().ok();
            }
            current = self.document.parent(node);
        }
        None
    }
}
