//! The array-backed loop element.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use tether_core::{
    ArraySurrogate, ChangeEvent, EventOrigin, ItemMove, ItemSelection, Observer, Value,
};

use crate::binder::BinderCore;
use crate::config::attrs;
use crate::context::{Context, ContextValue};
use crate::dom::{Gesture, NodeId};
use crate::element::{BindingElement, ElementBase};
use crate::error::Result;
use crate::expr::Expr;

const TARGET: &str = "tether::element";

/// An element materializing one subtree clone per array item.
///
/// At creation the bound node is detached and kept as the template; a marker
/// node takes its place so clones keep their document position. Each render
/// rebuilds the clones from the current items. Selection does not re-render:
/// it only toggles the configured class across the existing item nodes, so
/// item node identity survives selection changes.
pub struct ArrayElement {
    base: ElementBase,
    data: ArraySurrogate,
    /// Item and loop-status alias names from the `foreach` attribute.
    aliases: Option<(String, Option<String>)>,
    /// `(id_property, parent_id_property)` for hierarchical rendering.
    recursive: Option<(String, String)>,
    editable: bool,
    selected_class: Option<String>,
    guard: Option<Expr>,
    epilogue: Option<Expr>,
    template: NodeId,
    marker: NodeId,
    item_nodes: Mutex<Vec<NodeId>>,
    weak_self: Weak<ArrayElement>,
}

impl ArrayElement {
    /// Build and wire an element over `node`, detaching it as the template.
    pub(crate) fn create(
        binder: &Arc<BinderCore>,
        node: NodeId,
        data: ArraySurrogate,
        context: Context,
    ) -> Result<Arc<Self>> {
        let base = ElementBase::new(binder, node, context);
        let aliases = base.attr(attrs::FOREACH).map(|spec| {
            let mut parts = spec.splitn(2, ',');
            let item = parts.next().unwrap_or_default().trim().to_string();
            let status = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            (item, status)
        });
        let recursive = base.attr(attrs::RECURSIVE).and_then(|spec| {
            let mut parts = spec.splitn(2, ',');
            let id = parts.next()?.trim().to_string();
            let parent_id = parts.next()?.trim().to_string();
            Some((id, parent_id))
        });
        let editable = base.attr(attrs::EDITABLE).is_some_and(|v| v == "true");
        let selected_class = base.attr(attrs::SELECTED_ITEM_CLASS);
        let guard = base.expr_attr(attrs::IF)?;
        let epilogue = base.expr_attr(attrs::EXECUTE)?;

        // Swap the bound node for a marker and keep it as the template.
        let document = base.document.clone();
        let marker = document.create_element("slot");
        document.insert_before(marker, node);
        document.detach(node);

        let element = Arc::new_cyclic(|weak_self: &Weak<ArrayElement>| ArrayElement {
            base,
            data,
            aliases,
            recursive,
            editable,
            selected_class,
            guard,
            epilogue,
            template: node,
            marker,
            item_nodes: Mutex::new(Vec::new()),
            weak_self: weak_self.clone(),
        });

        element
            .data
            .add_observer(element.weak_self.clone() as Weak<dyn Observer>);
        element.base.observable.add_observer(element.data.as_observer());
        Ok(element)
    }

    /// Drop the materialized item nodes and their bound elements.
    fn clear_items(&self) -> Result<()> {
        let binder = self.base.binder()?;
        for node in self.item_nodes.lock().drain(..) {
            binder.release_subtree(node);
            self.base.document.remove(node);
        }
        Ok(())
    }

    /// Render order and depth per item. Flat arrays render in index order at
    /// depth zero; hierarchical arrays render parents before their children.
    fn render_order(&self) -> Vec<(usize, usize)> {
        let len = self.data.len();
        let Some((id_prop, parent_prop)) = &self.recursive else {
            return (0..len).map(|index| (index, 0)).collect();
        };
        let items: Vec<Value> = (0..len)
            .map(|index| self.data.get(index).unwrap_or(Value::Null))
            .collect();
        let id_of = |item: &Value| -> Value {
            item.as_object()
                .and_then(|map| map.get(id_prop))
                .cloned()
                .unwrap_or(Value::Null)
        };
        let parent_of = |item: &Value| -> Value {
            item.as_object()
                .and_then(|map| map.get(parent_prop))
                .cloned()
                .unwrap_or(Value::Null)
        };
        let is_root = |item: &Value| -> bool {
            let parent = parent_of(item);
            parent == Value::Null || !items.iter().any(|other| id_of(other) == parent)
        };
        let mut order = Vec::with_capacity(len);
        // Parents are emitted before children; orphans count as roots.
        let mut stack: Vec<(usize, usize)> = (0..len)
            .rev()
            .filter(|&index| is_root(&items[index]))
            .map(|index| (index, 0))
            .collect();
        while let Some((index, depth)) = stack.pop() {
            order.push((index, depth));
            let id = id_of(&items[index]);
            if id == Value::Null {
                continue;
            }
            for child in (0..len).rev() {
                if parent_of(&items[child]) == id {
                    stack.push((child, depth + 1));
                }
            }
        }
        order
    }

    /// Loop-status object for one rendered item.
    fn status_value(&self, index: usize, size: usize, depth: usize) -> Value {
        let mut entries = vec![
            ("index".to_string(), Value::Int(index as i64)),
            ("count".to_string(), Value::Int(index as i64 + 1)),
            ("size".to_string(), Value::Int(size as i64)),
            ("first".to_string(), Value::Bool(index == 0)),
            ("last".to_string(), Value::Bool(index + 1 == size)),
        ];
        if self.recursive.is_some() {
            entries.push(("depth".to_string(), Value::Int(depth as i64)));
        }
        Value::from_entries(entries)
    }

    /// Toggle the selected class across the current item nodes.
    fn apply_selection(&self) {
        let Some(class) = &self.selected_class else {
            return;
        };
        let selected = self.data.selected_item_index();
        let index_attr = self.base.config.attr(attrs::INDEX);
        for node in self.item_nodes.lock().iter() {
            let index: Option<usize> = self
                .base
                .document
                .attribute(*node, &index_attr)
                .and_then(|text| text.parse().ok());
            if index.is_some() && index == selected {
                self.base.document.add_class(*node, class);
            } else {
                self.base.document.remove_class(*node, class);
            }
        }
    }

    /// The item index of the nearest enclosing item node, starting at
    /// `node`.
    fn index_of(&self, node: NodeId) -> Option<usize> {
        let items = self.item_nodes.lock();
        let mut current = Some(node);
        while let Some(candidate) = current {
            if items.contains(&candidate) {
                let index_attr = self.base.config.attr(attrs::INDEX);
                return self
                    .base
                    .document
                    .attribute(candidate, &index_attr)?
                    .parse()
                    .ok();
            }
            current = self.base.document.parent(candidate);
        }
        None
    }
}

impl BindingElement for ArrayElement {
    fn node(&self) -> NodeId {
        self.base.node
    }

    fn render(&self) -> Result<()> {
        let visible = match &self.guard {
            Some(expr) => expr.eval_truthy(&self.base.context)?,
            None => true,
        };
        self.base.document.set_hidden(self.marker, !visible);
        self.clear_items()?;
        if !visible {
            return Ok(());
        }
        let binder = self.base.binder()?;
        let Some((item_alias, status_alias)) = &self.aliases else {
            // Without a loop specification the template renders exactly once
            // against the surrounding context.
            let clone = self.base.document.clone_subtree(self.template);
            self.base.document.insert_before(clone, self.marker);
            binder.initialize_in(clone, &self.base.context)?;
            binder.register_gesture(clone, self.weak_self.clone());
            self.item_nodes.lock().push(clone);
            self.base.run_epilogue(&self.epilogue)?;
            return Ok(());
        };
        let size = self.data.len();
        let index_attr = self.base.config.attr(attrs::INDEX);
        for (index, depth) in self.render_order() {
            let clone = self.base.document.clone_subtree(self.template);
            self.base
                .document
                .set_attribute(clone, &index_attr, index.to_string());
            if self.editable {
                self.base.document.set_attribute(clone, "draggable", "true");
            }
            self.base.document.insert_before(clone, self.marker);

            let mut context = self.base.context.child();
            if let Some(slot) = self.data.item(index) {
                context.set(item_alias.clone(), ContextValue::from_slot(slot));
            }
            if let Some(status_alias) = status_alias {
                context.set(status_alias.clone(), self.status_value(index, size, depth));
            }
            binder.initialize_in(clone, &context)?;
            binder.register_gesture(clone, self.weak_self.clone());
            self.item_nodes.lock().push(clone);
        }
        self.apply_selection();
        self.base.run_epilogue(&self.epilogue)
    }

    fn handle_gesture(&self, node: NodeId, gesture: &Gesture) -> Result<bool> {
        match gesture {
            Gesture::Click => {
                let Some(index) = self.index_of(node) else {
                    return Ok(false);
                };
                let event = ChangeEvent::ItemSelecting(ItemSelection {
                    origin: EventOrigin::element(
                        self.weak_self.clone() as Weak<dyn Observer>,
                        node.as_raw(),
                    ),
                    data: self.data.to_value(),
                    index,
                });
                self.base.observable.notify_observers(Some(&event));
                Ok(true)
            }
            Gesture::DragDrop { from } => {
                if !self.editable {
                    return Ok(false);
                }
                let (Some(from_index), Some(to_index)) =
                    (self.index_of(*from), self.index_of(node))
                else {
                    return Ok(false);
                };
                let event = ChangeEvent::ItemMoving(ItemMove {
                    origin: EventOrigin::element(
                        self.weak_self.clone() as Weak<dyn Observer>,
                        node.as_raw(),
                    ),
                    data: self.data.to_value(),
                    from_index,
                    to_index,
                });
                self.base.observable.notify_observers(Some(&event));
                Ok(true)
            }
            Gesture::Edit { .. } => Ok(false),
        }
    }
}

impl Observer for ArrayElement {
    fn update(&self, event: Option<&ChangeEvent>) {
        let result = match event {
            // Structural change: rebuild the item nodes.
            None => self.render(),
            Some(ChangeEvent::ItemSelected(_)) => {
                // Class toggle only; the item nodes stay as they are.
                self.apply_selection();
                Ok(())
            }
            Some(ChangeEvent::ItemMoved(_)) => self.render(),
            Some(ChangeEvent::PropertyChanged(change)) => {
                // An item's parent key changed: the hierarchy moved, so the
                // whole loop re-renders. Other item properties are handled
                // by the elements inside each item.
                match &self.recursive {
                    Some((_, parent_prop)) if change.property == *parent_prop => self.render(),
                    _ => Ok(()),
                }
            }
            Some(_) => Ok(()),
        };
        if let Err(error) = result {
            tracing::error!(target: TARGET, %error, "render failed after model change");
        }
    }
}
