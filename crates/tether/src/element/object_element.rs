//! The object-backed element.

use std::sync::{Arc, Weak};

use tether_core::{
    ChangeEvent, EventOrigin, ObjectSurrogate, Observer, PropertyChange, Value,
};

use crate::binder::BinderCore;
use crate::config::attrs;
use crate::context::Context;
use crate::dom::{Gesture, NodeId};
use crate::element::{BindingElement, ElementBase};
use crate::error::Result;
use crate::expr::Expr;
use crate::format::Format;

const TARGET: &str = "tether::element";

/// An element rendering one property of an object surrogate as text.
///
/// The element and the surrogate observe each other: committed model changes
/// re-render the node, and user edits are raised at the surrogate as
/// `PropertyChanging` so listeners can veto them before commit.
pub struct ObjectElement {
    base: ElementBase,
    data: ObjectSurrogate,
    property: Option<String>,
    format: Option<Format>,
    guard: Option<Expr>,
    epilogue: Option<Expr>,
    weak_self: Weak<ObjectElement>,
}

impl ObjectElement {
    /// Build and wire an element over `node`.
    pub(crate) fn create(
        binder: &Arc<BinderCore>,
        node: NodeId,
        data: ObjectSurrogate,
        context: Context,
    ) -> Result<Arc<Self>> {
        let base = ElementBase::new(binder, node, context);
        let property = base.attr(attrs::PROPERTY);
        let format = match base.attr(attrs::FORMAT) {
            Some(descriptor) => Some(Format::from_descriptor(&descriptor)?),
            None => None,
        };
        let guard = base.expr_attr(attrs::IF)?;
        let epilogue = base.expr_attr(attrs::EXECUTE)?;

        let element = Arc::new_cyclic(|weak_self: &Weak<ObjectElement>| ObjectElement {
            base,
            data,
            property,
            format,
            guard,
            epilogue,
            weak_self: weak_self.clone(),
        });

        // Mutual observation: model changes re-render the element, and the
        // element's raised events reach the model handler.
        element
            .data
            .add_observer(element.weak_self.clone() as Weak<dyn Observer>);
        element.base.observable.add_observer(element.data.as_observer());
        Ok(element)
    }

    /// Decode edited text into a model value.
    fn decode(&self, text: &str) -> Result<Value> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        match &self.format {
            Some(format) => Ok(format.decode(text)?),
            None => Ok(Value::String(text.to_string())),
        }
    }
}

impl BindingElement for ObjectElement {
    fn node(&self) -> NodeId {
        self.base.node
    }

    fn render(&self) -> Result<()> {
        if !self.base.apply_guard(&self.guard)? {
            return Ok(());
        }
        if let Some(property) = &self.property {
            let value = self.data.value_at(property).unwrap_or(Value::Null);
            let text = match &self.format {
                Some(format) => format.encode(&value),
                None => value.display_string(),
            };
            self.base.document.set_text(self.base.node, text);

            // Reflect effective editability onto the node.
            if self.data.is_readonly(property) {
                self.base
                    .document
                    .set_attribute(self.base.node, "readonly", "readonly");
            } else {
                self.base.document.remove_attribute(self.base.node, "readonly");
            }
            if self.data.is_disabled(property) {
                self.base
                    .document
                    .set_attribute(self.base.node, "disabled", "disabled");
            } else {
                self.base.document.remove_attribute(self.base.node, "disabled");
            }
        }
        self.base.run_epilogue(&self.epilogue)
    }

    fn handle_gesture(&self, _node: NodeId, gesture: &Gesture) -> Result<bool> {
        let Gesture::Edit { text } = gesture else {
            return Ok(false);
        };
        let Some(property) = &self.property else {
            return Ok(false);
        };
        if self.data.is_readonly(property) || self.data.is_disabled(property) {
            // Discard the edit by re-rendering the committed state.
            self.render()?;
            return Ok(true);
        }
        // A decode failure surfaces to the dispatch caller; the node keeps
        // its edited text.
        let value = self.decode(text)?;
        let event = ChangeEvent::PropertyChanging(PropertyChange {
            origin: EventOrigin::element(
                self.weak_self.clone() as Weak<dyn Observer>,
                self.base.node.as_raw(),
            ),
            data: self.data.to_value(),
            property: property.clone(),
            value,
            index: self.base.item_index(),
        });
        self.base.observable.notify_observers(Some(&event));
        Ok(true)
    }
}

impl Observer for ObjectElement {
    fn update(&self, _event: Option<&ChangeEvent>) {
        if let Err(error) = self.render() {
            tracing::error!(target: TARGET, %error, "render failed after model change");
        }
    }
}
