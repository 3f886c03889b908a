//! Error types for the binding runtime.

use thiserror::Error;

use crate::expr::ExprError;
use crate::format::FormatError;

/// The main error type for binding operations.
#[derive(Debug, Error)]
pub enum BindError {
    /// The bind attribute named something the context cannot resolve.
    #[error("bind target '{name}' was not found in the context")]
    BindingNotFound {
        /// The dotted name that failed to resolve.
        name: String,
    },
    /// The bind attribute resolved to a primitive; only objects and arrays
    /// can back an element.
    #[error("bind target '{name}' is not a bindable object or array")]
    NotBindable {
        /// The dotted name that resolved to a primitive.
        name: String,
    },
    /// A node handle no longer refers to a live document node.
    #[error("node is no longer part of the document")]
    NodeMissing,
    /// The binder that owns this element has been dropped.
    #[error("the owning binder has been dropped")]
    BinderDropped,
    /// A format codec rejected its input.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// An `if`/`execute` expression failed to parse or evaluate.
    #[error(transparent)]
    Expr(#[from] ExprError),
    /// A surrogate operation failed.
    #[error(transparent)]
    Surrogate(#[from] tether_core::SurrogateError),
}

/// A specialized Result type for binding operations.
pub type Result<T> = std::result::Result<T, BindError>;
