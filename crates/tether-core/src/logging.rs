//! Logging and debugging facilities for Tether core.
//!
//! Tether uses the `tracing` crate for instrumentation. The library never
//! installs a subscriber; applications that want logs initialize one:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! # Debug Visualization
//!
//! [`SurrogateTreeDebug`] renders a surrogate tree, handy when chasing a
//! propagation problem:
//!
//! ```
//! use tether_core::logging::SurrogateTreeDebug;
//! use tether_core::{wrap, Value};
//! use serde_json::json;
//!
//! let data = wrap(Value::from(json!({"name": "a", "tags": [1]}))).unwrap();
//! println!("{}", SurrogateTreeDebug::new(&data).format_tree());
//! ```

use std::fmt::Write as FmtWrite;

use crate::surrogate::{Slot, Surrogate};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "tether_core";
    /// Observable notification fan-out.
    pub const OBSERVABLE: &str = "tether_core::observable";
    /// Event dispatch and veto aggregation.
    pub const EVENT: &str = "tether_core::event";
    /// Object interception handler.
    pub const OBJECT: &str = "tether_core::object";
    /// Array interception handler.
    pub const ARRAY: &str = "tether_core::array";
}

/// Debug utility for visualizing a surrogate tree.
pub struct SurrogateTreeDebug<'a> {
    root: &'a Surrogate,
}

impl<'a> SurrogateTreeDebug<'a> {
    /// Create a visualizer for one surrogate tree.
    pub fn new(root: &'a Surrogate) -> Self {
        Self { root }
    }

    /// Render the tree, one line per slot, indented by depth.
    pub fn format_tree(&self) -> String {
        let mut output = String::new();
        match self.root {
            Surrogate::Object(surrogate) => {
                output.push_str("(object)\n");
                Self::format_object(surrogate, 1, &mut output);
            }
            Surrogate::Array(surrogate) => {
                let _ = writeln!(output, "(array, len {})", surrogate.len());
                Self::format_array(surrogate, 1, &mut output);
            }
        }
        output
    }

    fn format_object(surrogate: &crate::ObjectSurrogate, depth: usize, output: &mut String) {
        for key in surrogate.keys() {
            let indent = "  ".repeat(depth);
            match surrogate.slot(&key) {
                Some(Slot::Leaf(value)) => {
                    let _ = writeln!(output, "{indent}{key}: {} = {value}", value.kind());
                }
                Some(Slot::Object(child)) => {
                    let _ = writeln!(output, "{indent}{key}: (object)");
                    Self::format_object(&child, depth + 1, output);
                }
                Some(Slot::Array(child)) => {
                    let _ = writeln!(output, "{indent}{key}: (array, len {})", child.len());
                    Self::format_array(&child, depth + 1, output);
                }
                None => {}
            }
        }
    }

    fn format_array(surrogate: &crate::ArraySurrogate, depth: usize, output: &mut String) {
        for index in 0..surrogate.len() {
            let indent = "  ".repeat(depth);
            match surrogate.item(index) {
                Some(Slot::Leaf(value)) => {
                    let _ = writeln!(output, "{indent}[{index}]: {} = {value}", value.kind());
                }
                Some(Slot::Object(child)) => {
                    let _ = writeln!(output, "{indent}[{index}]: (object)");
                    Self::format_object(&child, depth + 1, output);
                }
                Some(Slot::Array(child)) => {
                    let _ = writeln!(output, "{indent}[{index}]: (array, len {})", child.len());
                    Self::format_array(&child, depth + 1, output);
                }
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{wrap, Value};
    use serde_json::json;

    #[test]
    fn test_format_tree() {
        let data = wrap(Value::from(json!({
            "name": "a",
            "address": {"city": "x"},
            "tags": [1, 2],
        })))
        .unwrap();
        let output = SurrogateTreeDebug::new(&data).format_tree();
        assert!(output.contains("name: string = a"));
        assert!(output.contains("address: (object)"));
        assert!(output.contains("city: string = x"));
        assert!(output.contains("tags: (array, len 2)"));
        assert!(output.contains("[0]: integer = 1"));
    }
}
