//! Logging and debugging facilities.
//!
//! Trellis instruments itself with the `tracing` crate. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! [`ElementTreeDebug`] renders the element hierarchy for diagnostics:
//!
//! ```
//! use trellis_core::{SharedElementRegistry, logging::ElementTreeDebug};
//!
//! let registry = SharedElementRegistry::new();
//! let window = registry.register();
//! registry.set_name(window, "window").unwrap();
//!
//! let debug = ElementTreeDebug::new(&registry);
//! println!("{}", debug.format_subtree(window).unwrap());
//! ```

use std::fmt::Write as _;

use crate::element::{ElementId, ElementResult, SharedElementRegistry};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "trellis_core";
    /// Element tree target.
    pub const ELEMENT: &str = "trellis_core::element";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "trellis_core::signal";
    /// UI task queue target.
    pub const QUEUE: &str = "trellis_core::queue";
    /// Command routing target.
    pub const ROUTER: &str = "trellis_commands::router";
    /// Command attachment target.
    pub const ATTACHMENT: &str = "trellis_commands::attachment";
}

/// Debug utility for visualizing element trees.
pub struct ElementTreeDebug<'a> {
    registry: &'a SharedElementRegistry,
}

impl<'a> ElementTreeDebug<'a> {
    /// Create a visualizer over `registry`.
    pub fn new(registry: &'a SharedElementRegistry) -> Self {
        Self { registry }
    }

    /// Format the subtree rooted at `root`, one element per line.
    pub fn format_subtree(&self, root: ElementId) -> ElementResult<String> {
        let mut output = String::new();
        self.format_into(root, 0, &mut output)?;
        Ok(output)
    }

    fn format_into(&self, id: ElementId, depth: usize, output: &mut String) -> ElementResult<()> {
        let name = self.registry.name(id)?;
        let display = if name.is_empty() { "(unnamed)" } else { &name };
        for _ in 0..depth {
            output.push_str("  ");
        }
        writeln!(output, "{display} [{id:?}]").expect("write to String");

        for child in self.registry.children(id)? {
            self.format_into(child, depth + 1, output)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hierarchy_with_names() {
        let registry = SharedElementRegistry::new();
        let window = registry.register();
        let button = registry.register_child(window).unwrap();
        registry.set_name(window, "window").unwrap();
        registry.set_name(button, "button").unwrap();

        let output = ElementTreeDebug::new(&registry)
            .format_subtree(window)
            .unwrap();

        assert!(output.contains("window"));
        assert!(output.contains("  button"));
    }

    #[test]
    fn unnamed_elements_get_a_placeholder() {
        let registry = SharedElementRegistry::new();
        let element = registry.register();

        let output = ElementTreeDebug::new(&registry)
            .format_subtree(element)
            .unwrap();

        assert!(output.contains("(unnamed)"));
    }
}
