//! In-memory document tree.
//!
//! The binding runtime treats the host UI tree abstractly: it needs nodes
//! with a tag, attributes, a class list, text content, a hidden flag and
//! parent/child structure, plus subtree cloning and insertion relative to a
//! marker. [`Document`] is that environment in concrete, headless form —
//! enough to run and test every binding behavior without a real UI stack.
//!
//! Nodes live in a slotmap arena keyed by [`NodeId`]; a removed node's key
//! simply stops resolving. Handles to the document are cheap clones sharing
//! one tree.
//!
//! User input is modeled as a [`Gesture`] injected through
//! [`crate::Binder::dispatch_gesture`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{new_key_type, Key, KeyData, SlotMap};

new_key_type! {
    /// A unique identifier for a document node.
    ///
    /// IDs are never reused for the lifetime of the arena slot generation,
    /// so a stale ID fails lookups instead of aliasing a new node.
    pub struct NodeId;
}

impl NodeId {
    /// The raw representation, used as the opaque node key in event
    /// origins.
    pub fn as_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Rebuild an ID from its raw representation.
    pub fn from_raw(raw: u64) -> Self {
        KeyData::from_ffi(raw).into()
    }
}

/// A user gesture injected into the document.
#[derive(Debug, Clone)]
pub enum Gesture {
    /// A click on a node.
    Click,
    /// An edit committing new text into a node.
    Edit {
        /// The edited text content.
        text: String,
    },
    /// A drag of `from` dropped onto the gestured node.
    DragDrop {
        /// The node that was dragged.
        from: NodeId,
    },
}

#[derive(Default, Clone)]
struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    text: String,
    hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct DocumentInner {
    nodes: SlotMap<NodeId, NodeData>,
    root: NodeId,
}

/// A headless document tree. Clones share the same tree.
#[derive(Clone)]
pub struct Document {
    inner: Arc<RwLock<DocumentInner>>,
}

impl Document {
    /// Create a document containing only a root node.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeData {
            tag: "root".to_string(),
            ..NodeData::default()
        });
        Self {
            inner: Arc::new(RwLock::new(DocumentInner { nodes, root })),
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.inner.read().root
    }

    /// Create a detached node with the given tag.
    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.inner.write().nodes.insert(NodeData {
            tag: tag.into(),
            ..NodeData::default()
        })
    }

    /// Whether the node is still part of the arena.
    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.read().nodes.contains_key(node)
    }

    /// The node's tag, if it exists.
    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.inner.read().nodes.get(node).map(|n| n.tag.clone())
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(parent) || !inner.nodes.contains_key(child) {
            return;
        }
        detach_in(&mut inner, child);
        inner.nodes[parent].children.push(child);
        inner.nodes[child].parent = Some(parent);
    }

    /// Insert `node` into `reference`'s parent, immediately before
    /// `reference`.
    pub fn insert_before(&self, node: NodeId, reference: NodeId) {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(node) {
            return;
        }
        let Some(parent) = inner.nodes.get(reference).and_then(|n| n.parent) else {
            return;
        };
        detach_in(&mut inner, node);
        let position = inner.nodes[parent]
            .children
            .iter()
            .position(|&c| c == reference)
            .unwrap_or(inner.nodes[parent].children.len());
        inner.nodes[parent].children.insert(position, node);
        inner.nodes[node].parent = Some(parent);
    }

    /// Detach a node from its parent, keeping the subtree alive.
    pub fn detach(&self, node: NodeId) {
        detach_in(&mut self.inner.write(), node);
    }

    /// Remove a node and its entire subtree from the document.
    pub fn remove(&self, node: NodeId) {
        let mut inner = self.inner.write();
        detach_in(&mut inner, node);
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(data) = inner.nodes.remove(current) {
                stack.extend(data.children);
            }
        }
    }

    /// Deep-copy a subtree. The copy is detached.
    pub fn clone_subtree(&self, node: NodeId) -> NodeId {
        let mut inner = self.inner.write();
        clone_in(&mut inner, node)
    }

    /// The node's parent, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.read().nodes.get(node).and_then(|n| n.parent)
    }

    /// The node's direct children.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .read()
            .nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// All descendants in document order, the node itself excluded.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.read();
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = inner
            .nodes
            .get(node)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(data) = inner.nodes.get(current) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        result
    }

    /// Set one attribute.
    pub fn set_attribute(&self, node: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let Some(data) = self.inner.write().nodes.get_mut(node) {
            data.attributes.insert(name.into(), value.into());
        }
    }

    /// Read one attribute.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .read()
            .nodes
            .get(node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    /// Whether the attribute is present.
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.inner
            .read()
            .nodes
            .get(node)
            .is_some_and(|n| n.attributes.contains_key(name))
    }

    /// Remove one attribute.
    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        if let Some(data) = self.inner.write().nodes.get_mut(node) {
            data.attributes.remove(name);
        }
    }

    /// Replace the node's text content.
    pub fn set_text(&self, node: NodeId, text: impl Into<String>) {
        if let Some(data) = self.inner.write().nodes.get_mut(node) {
            data.text = text.into();
        }
    }

    /// The node's text content.
    pub fn text(&self, node: NodeId) -> String {
        self.inner
            .read()
            .nodes
            .get(node)
            .map(|n| n.text.clone())
            .unwrap_or_default()
    }

    /// Set the hidden flag.
    pub fn set_hidden(&self, node: NodeId, hidden: bool) {
        if let Some(data) = self.inner.write().nodes.get_mut(node) {
            data.hidden = hidden;
        }
    }

    /// The hidden flag.
    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.inner
            .read()
            .nodes
            .get(node)
            .is_some_and(|n| n.hidden)
    }

    /// Add a class if not already present.
    pub fn add_class(&self, node: NodeId, class: &str) {
        if let Some(data) = self.inner.write().nodes.get_mut(node)
            && !data.classes.iter().any(|c| c == class)
        {
            data.classes.push(class.to_string());
        }
    }

    /// Remove a class.
    pub fn remove_class(&self, node: NodeId, class: &str) {
        if let Some(data) = self.inner.write().nodes.get_mut(node) {
            data.classes.retain(|c| c != class);
        }
    }

    /// Whether the class is present.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.inner
            .read()
            .nodes
            .get(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn detach_in(inner: &mut DocumentInner, node: NodeId) {
    let Some(parent) = inner.nodes.get(node).and_then(|n| n.parent) else {
        return;
    };
    if let Some(parent_data) = inner.nodes.get_mut(parent) {
        parent_data.children.retain(|&c| c != node);
    }
    inner.nodes[node].parent = None;
}

fn clone_in(inner: &mut DocumentInner, node: NodeId) -> NodeId {
    let (mut data, children) = match inner.nodes.get(node) {
        Some(original) => (original.clone(), original.children.clone()),
        None => return NodeId::default(),
    };
    data.parent = None;
    data.children = Vec::new();
    let copy = inner.nodes.insert(data);
    for child in children {
        let child_copy = clone_in(inner, child);
        inner.nodes[copy].children.push(child_copy);
        inner.nodes[child_copy].parent = Some(copy);
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_query_tree() {
        let doc = Document::new();
        let list = doc.create_element("list");
        let item = doc.create_element("item");
        doc.append_child(doc.root(), list);
        doc.append_child(list, item);

        assert_eq!(doc.parent(item), Some(list));
        assert_eq!(doc.children(list), vec![item]);
        assert_eq!(doc.descendants(doc.root()), vec![list, item]);
        assert_eq!(doc.tag(item).as_deref(), Some("item"));
    }

    #[test]
    fn test_insert_before() {
        let doc = Document::new();
        let marker = doc.create_element("slot");
        doc.append_child(doc.root(), marker);
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.insert_before(a, marker);
        doc.insert_before(b, marker);
        assert_eq!(doc.children(doc.root()), vec![a, b, marker]);
    }

    #[test]
    fn test_remove_drops_subtree() {
        let doc = Document::new();
        let list = doc.create_element("list");
        let item = doc.create_element("item");
        doc.append_child(doc.root(), list);
        doc.append_child(list, item);

        doc.remove(list);
        assert!(!doc.contains(list));
        assert!(!doc.contains(item));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_clone_subtree_is_detached_deep_copy() {
        let doc = Document::new();
        let row = doc.create_element("row");
        let cell = doc.create_element("cell");
        doc.set_attribute(row, "k", "v");
        doc.set_text(cell, "hello");
        doc.append_child(doc.root(), row);
        doc.append_child(row, cell);

        let copy = doc.clone_subtree(row);
        assert_ne!(copy, row);
        assert_eq!(doc.parent(copy), None);
        assert_eq!(doc.attribute(copy, "k").as_deref(), Some("v"));
        let copied_cell = doc.children(copy)[0];
        assert_eq!(doc.text(copied_cell), "hello");

        // Mutating the copy leaves the original alone.
        doc.set_text(copied_cell, "changed");
        assert_eq!(doc.text(cell), "hello");
    }

    #[test]
    fn test_classes_and_hidden() {
        let doc = Document::new();
        let node = doc.create_element("row");
        doc.add_class(node, "selected");
        doc.add_class(node, "selected");
        assert!(doc.has_class(node, "selected"));
        doc.remove_class(node, "selected");
        assert!(!doc.has_class(node, "selected"));

        doc.set_hidden(node, true);
        assert!(doc.is_hidden(node));
    }

    #[test]
    fn test_node_id_raw_round_trip() {
        let doc = Document::new();
        let node = doc.create_element("x");
        assert_eq!(NodeId::from_raw(node.as_raw()), node);
    }
}
