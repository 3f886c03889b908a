//! Binder configuration.
//!
//! [`BindConfig`] is a plain value constructed by the application and handed
//! to the [`crate::Binder`]. There is no global configuration state; two
//! binders with different namespaces can coexist in one process.

/// Attribute names understood by the binder, composed with the configured
/// namespace (e.g. `data-tether-bind`).
pub mod attrs {
    /// Names the context entry an element binds to.
    pub const BIND: &str = "bind";
    /// Dotted property path rendered by an object element.
    pub const PROPERTY: &str = "property";
    /// Format descriptor, e.g. `number(2)`.
    pub const FORMAT: &str = "format";
    /// Guard expression controlling visibility.
    pub const IF: &str = "if";
    /// Expression evaluated after each render.
    pub const EXECUTE: &str = "execute";
    /// Item alias names for array elements: `item` or `item,status`.
    pub const FOREACH: &str = "foreach";
    /// Recursive rendering key pair: `idProp,parentIdProp`.
    pub const RECURSIVE: &str = "recursive";
    /// Enables drag/drop reordering of array items.
    pub const EDITABLE: &str = "editable";
    /// Class toggled on the selected item's root node.
    pub const SELECTED_ITEM_CLASS: &str = "selected-item-class";
    /// Item index written onto materialized nodes.
    pub const INDEX: &str = "index";
    /// Initialization marker; nodes carrying it are skipped by scans.
    pub const ID: &str = "id";
}

/// Configuration for one [`crate::Binder`] instance.
#[derive(Debug, Clone)]
pub struct BindConfig {
    namespace: String,
}

impl BindConfig {
    /// Configuration with the default `data-tether` attribute namespace.
    pub fn new() -> Self {
        Self {
            namespace: "data-tether".to_string(),
        }
    }

    /// Configuration with a custom attribute namespace.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The attribute namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The full attribute name for one of the [`attrs`] constants.
    pub fn attr(&self, name: &str) -> String {
        format!("{}-{}", self.namespace, name)
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self::new()
    }
}
