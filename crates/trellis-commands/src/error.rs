//! Error types for the command system.

use trellis_core::ElementError;

use crate::gesture::GestureKind;

/// Errors from command registration and dispatch operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// An element-tree operation failed (invalid or destroyed element).
    Element(ElementError),
    /// An input binding was given a gesture of the wrong kind.
    GestureKindMismatch {
        /// The kind the binding is constrained to.
        expected: GestureKind,
        /// The kind of the rejected gesture.
        found: GestureKind,
    },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Element(err) => write!(f, "{err}"),
            CommandError::GestureKindMismatch { expected, found } => {
                write!(f, "binding requires a {expected} gesture, got a {found} gesture")
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Element(err) => Some(err),
            CommandError::GestureKindMismatch { .. } => None,
        }
    }
}

impl From<ElementError> for CommandError {
    fn from(err: ElementError) -> Self {
        CommandError::Element(err)
    }
}

/// Convenient result alias for command operations.
pub type CommandResult<T> = Result<T, CommandError>;
