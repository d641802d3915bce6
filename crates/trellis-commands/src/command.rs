//! The command abstraction and the self-contained command flavor.
//!
//! Two flavors of command exist and deliberately keep separate execution
//! paths:
//!
//! - A *simple* command ([`Command`]) carries its own availability and
//!   execution logic. Asking it anything never touches the element tree.
//! - A *routed* command ([`crate::RoutedCommand`]) is an identity; its
//!   behavior lives in [`crate::CommandBinding`]s resolved against the
//!   element tree by the [`crate::CommandRouter`].
//!
//! [`CommandRef`] holds either flavor so attachment points and input
//! bindings can reference commands uniformly, while every call site that
//! acts on one still branches on the flavor.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use trellis_core::Signal;

use crate::routed::RoutedCommand;

/// An opaque parameter passed through command evaluation and execution.
///
/// Compared by pointer identity where the system needs to tell "same
/// parameter" from "different parameter" (the re-entrant availability cache).
pub type CommandParameter = Arc<dyn Any + Send + Sync>;

/// Check two optional parameters for pointer identity.
pub(crate) fn same_parameter(
    a: Option<&CommandParameter>,
    b: Option<&CommandParameter>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// A self-contained command: owns its availability and execution logic.
pub trait Command: Send + Sync {
    /// Whether the command can execute with `parameter` right now.
    fn can_execute(&self, parameter: Option<&CommandParameter>) -> bool;

    /// Execute the command with `parameter`.
    fn execute(&self, parameter: Option<&CommandParameter>);

    /// Signal raised when the result of [`can_execute`](Self::can_execute)
    /// may have changed.
    fn can_execute_changed(&self) -> &Signal<()>;
}

/// A [`Command`] built from closures.
pub struct FnCommand {
    execute: Box<dyn Fn(Option<&CommandParameter>) + Send + Sync>,
    can_execute: Option<Box<dyn Fn(Option<&CommandParameter>) -> bool + Send + Sync>>,
    changed: Signal<()>,
}

impl FnCommand {
    /// Create a command that is always executable.
    pub fn new<F>(execute: F) -> Self
    where
        F: Fn(Option<&CommandParameter>) + Send + Sync + 'static,
    {
        Self {
            execute: Box::new(execute),
            can_execute: None,
            changed: Signal::new(),
        }
    }

    /// Create a command gated by a `can_execute` predicate.
    pub fn with_can_execute<F, G>(execute: F, can_execute: G) -> Self
    where
        F: Fn(Option<&CommandParameter>) + Send + Sync + 'static,
        G: Fn(Option<&CommandParameter>) -> bool + Send + Sync + 'static,
    {
        Self {
            execute: Box::new(execute),
            can_execute: Some(Box::new(can_execute)),
            changed: Signal::new(),
        }
    }

    /// Notify subscribers that the predicate's result may have changed.
    pub fn raise_can_execute_changed(&self) {
        self.changed.emit(());
    }
}

impl Command for FnCommand {
    fn can_execute(&self, parameter: Option<&CommandParameter>) -> bool {
        match &self.can_execute {
            Some(predicate) => predicate(parameter),
            None => true,
        }
    }

    fn execute(&self, parameter: Option<&CommandParameter>) {
        (self.execute)(parameter);
    }

    fn can_execute_changed(&self) -> &Signal<()> {
        &self.changed
    }
}

/// A shared handle to either flavor of command.
///
/// Cloning is cheap; equality is pointer identity on the underlying command,
/// so two handles are equal only when they refer to the same instance.
#[derive(Clone)]
pub enum CommandRef {
    /// A self-contained command.
    Simple(Arc<dyn Command>),
    /// A tree-routed command identity.
    Routed(Arc<RoutedCommand>),
}

impl CommandRef {
    /// The routed command, if this handle holds one.
    pub fn as_routed(&self) -> Option<&Arc<RoutedCommand>> {
        match self {
            CommandRef::Routed(command) => Some(command),
            CommandRef::Simple(_) => None,
        }
    }

    /// The simple command, if this handle holds one.
    pub fn as_simple(&self) -> Option<&Arc<dyn Command>> {
        match self {
            CommandRef::Simple(command) => Some(command),
            CommandRef::Routed(_) => None,
        }
    }
}

impl PartialEq for CommandRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CommandRef::Simple(a), CommandRef::Simple(b)) => Arc::ptr_eq(a, b),
            (CommandRef::Routed(a), CommandRef::Routed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for CommandRef {}

impl fmt::Debug for CommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandRef::Simple(command) => f
                .debug_tuple("Simple")
                .field(&Arc::as_ptr(command))
                .finish(),
            CommandRef::Routed(command) => {
                f.debug_tuple("Routed").field(&command.name()).finish()
            }
        }
    }
}

impl From<Arc<RoutedCommand>> for CommandRef {
    fn from(command: Arc<RoutedCommand>) -> Self {
        CommandRef::Routed(command)
    }
}

impl From<&Arc<RoutedCommand>> for CommandRef {
    fn from(command: &Arc<RoutedCommand>) -> Self {
        CommandRef::Routed(command.clone())
    }
}

impl From<Arc<dyn Command>> for CommandRef {
    fn from(command: Arc<dyn Command>) -> Self {
        CommandRef::Simple(command)
    }
}

impl From<Arc<FnCommand>> for CommandRef {
    fn from(command: Arc<FnCommand>) -> Self {
        CommandRef::Simple(command)
    }
}

static_assertions::assert_impl_all!(CommandRef: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fn_command_without_predicate_is_always_executable() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        let command = FnCommand::new(move |_| {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(command.can_execute(None));
        command.execute(None);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fn_command_predicate_gates_availability() {
        let command = FnCommand::with_can_execute(|_| {}, |parameter| parameter.is_some());

        assert!(!command.can_execute(None));
        let parameter: CommandParameter = Arc::new(7_i32);
        assert!(command.can_execute(Some(&parameter)));
    }

    #[test]
    fn fn_command_change_notification() {
        let command = FnCommand::new(|_| {});
        let notified = Arc::new(AtomicUsize::new(0));

        let notified_clone = notified.clone();
        command.can_execute_changed().connect(move |_| {
            notified_clone.fetch_add(1, Ordering::SeqCst);
        });

        command.raise_can_execute_changed();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn command_ref_equality_is_pointer_identity() {
        let a: Arc<FnCommand> = Arc::new(FnCommand::new(|_| {}));
        let b: Arc<FnCommand> = Arc::new(FnCommand::new(|_| {}));

        let ref_a1 = CommandRef::from(a.clone());
        let ref_a2 = CommandRef::from(a);
        let ref_b = CommandRef::from(b);

        assert_eq!(ref_a1, ref_a2);
        assert_ne!(ref_a1, ref_b);
    }

    #[test]
    fn same_parameter_is_pointer_identity() {
        let a: CommandParameter = Arc::new(1_i32);
        let b: CommandParameter = Arc::new(1_i32);

        assert!(same_parameter(None, None));
        assert!(same_parameter(Some(&a), Some(&a)));
        assert!(!same_parameter(Some(&a), Some(&b)));
        assert!(!same_parameter(Some(&a), None));
    }
}
