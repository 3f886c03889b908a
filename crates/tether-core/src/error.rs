//! Error types for Tether core.

use std::fmt;

/// Errors raised by surrogate construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurrogateError {
    /// `wrap` was given a primitive value; only objects and arrays can be
    /// observed.
    NotStructured {
        /// The kind of value that was passed (e.g. "string", "null").
        kind: &'static str,
    },
    /// A structural array operation referenced a position past the end.
    IndexOutOfBounds {
        /// The requested position.
        index: usize,
        /// The array length at the time of the call.
        len: usize,
    },
}

impl fmt::Display for SurrogateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStructured { kind } => {
                write!(f, "Cannot wrap a {kind} value; only objects and arrays are observable")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "Index {index} is out of bounds for array of length {len}")
            }
        }
    }
}

impl std::error::Error for SurrogateError {}

/// A specialized Result type for Tether core operations.
pub type Result<T> = std::result::Result<T, SurrogateError>;
