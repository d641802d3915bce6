//! Bindings: the handlers that give routed commands behavior, and the
//! gesture-to-command mappings that trigger them.
//!
//! A [`CommandBinding`] lives on an element and answers for one routed
//! command: preview/bubble availability handlers plus an executed handler.
//! An [`InputBinding`] maps an [`InputGesture`] to a command invocation on
//! the element it is registered under.

use std::sync::Arc;

use trellis_core::{ElementId, UiQueue};

use crate::command::{CommandParameter, CommandRef};
use crate::error::{CommandError, CommandResult};
use crate::gesture::{GestureKind, InputGesture, KeyGesture, MouseGesture};
use crate::input::{Key, KeyboardModifiers, MouseAction};

/// Mutable arguments threaded through an availability query.
///
/// One instance is created lazily per query and reused across every handler
/// the walk visits, so a handler sees the flags its predecessors left (and
/// `can_execute` is reset before each handler that owns the decision runs).
pub struct CanExecuteEventArgs {
    command: CommandRef,
    parameter: Option<CommandParameter>,
    /// The handler's verdict. Starts `false`; the handler must set it.
    pub can_execute: bool,
    /// Stops the current query pass when set, leaving `can_execute` as the
    /// final answer.
    pub handled: bool,
}

impl CanExecuteEventArgs {
    pub(crate) fn new(command: CommandRef, parameter: Option<CommandParameter>) -> Self {
        Self {
            command,
            parameter,
            can_execute: false,
            handled: false,
        }
    }

    /// The command being queried.
    pub fn command(&self) -> &CommandRef {
        &self.command
    }

    /// The parameter the query was made with.
    pub fn parameter(&self) -> Option<&CommandParameter> {
        self.parameter.as_ref()
    }
}

/// Arguments delivered to an executed handler.
#[derive(Clone)]
pub struct ExecutedEventArgs {
    command: CommandRef,
    parameter: Option<CommandParameter>,
}

impl ExecutedEventArgs {
    pub(crate) fn new(command: CommandRef, parameter: Option<CommandParameter>) -> Self {
        Self { command, parameter }
    }

    /// The command that executed.
    pub fn command(&self) -> &CommandRef {
        &self.command
    }

    /// The parameter the execution was requested with.
    pub fn parameter(&self) -> Option<&CommandParameter> {
        self.parameter.as_ref()
    }
}

type CanExecuteHandler = Arc<dyn Fn(ElementId, &mut CanExecuteEventArgs) + Send + Sync>;
type ExecutedHandler = Arc<dyn Fn(ElementId, &ExecutedEventArgs) + Send + Sync>;

/// Handlers an element contributes for one routed command.
///
/// Built with the `with_*` methods, then registered via
/// [`crate::CommandRouter::add_command_binding`]. A binding with an executed
/// handler but no availability handler reports the command executable by
/// default.
#[derive(Clone)]
pub struct CommandBinding {
    command: CommandRef,
    executed: Option<ExecutedHandler>,
    can_execute: Option<CanExecuteHandler>,
    preview_can_execute: Option<CanExecuteHandler>,
}

impl CommandBinding {
    /// Create an empty binding for `command`.
    pub fn new(command: impl Into<CommandRef>) -> Self {
        Self {
            command: command.into(),
            executed: None,
            can_execute: None,
            preview_can_execute: None,
        }
    }

    /// Set the executed handler.
    ///
    /// The handler receives the element the binding is registered on and the
    /// execution arguments. It runs deferred on the UI queue, after the
    /// triggering event has fully unwound.
    pub fn with_executed<F>(mut self, handler: F) -> Self
    where
        F: Fn(ElementId, &ExecutedEventArgs) + Send + Sync + 'static,
    {
        self.executed = Some(Arc::new(handler));
        self
    }

    /// Set the bubble-pass availability handler.
    pub fn with_can_execute<F>(mut self, handler: F) -> Self
    where
        F: Fn(ElementId, &mut CanExecuteEventArgs) + Send + Sync + 'static,
    {
        self.can_execute = Some(Arc::new(handler));
        self
    }

    /// Set the preview-pass availability handler.
    ///
    /// Preview handlers run root-to-target, before any bubble handler, and
    /// can veto or approve the query for the whole subtree.
    pub fn with_preview_can_execute<F>(mut self, handler: F) -> Self
    where
        F: Fn(ElementId, &mut CanExecuteEventArgs) + Send + Sync + 'static,
    {
        self.preview_can_execute = Some(Arc::new(handler));
        self
    }

    /// The command this binding answers for.
    pub fn command(&self) -> &CommandRef {
        &self.command
    }

    /// Run the preview availability handler, if any.
    ///
    /// Creates the shared args lazily, resets the verdict, and returns the
    /// handler's answer. Returns `false` without touching `args` when no
    /// preview handler is set.
    pub(crate) fn query_preview_can_execute(
        &self,
        sender: ElementId,
        parameter: Option<&CommandParameter>,
        args: &mut Option<CanExecuteEventArgs>,
    ) -> bool {
        let Some(handler) = &self.preview_can_execute else {
            return false;
        };
        let args = Self::reset_args(&self.command, parameter, args);
        handler(sender, args);
        args.can_execute
    }

    /// Run the bubble availability handler.
    ///
    /// Without one, the binding answers for itself: it reports executable
    /// exactly when it has an executed handler. Otherwise same contract as
    /// [`query_preview_can_execute`](Self::query_preview_can_execute).
    pub(crate) fn query_can_execute(
        &self,
        sender: ElementId,
        parameter: Option<&CommandParameter>,
        args: &mut Option<CanExecuteEventArgs>,
    ) -> bool {
        let Some(handler) = &self.can_execute else {
            return self.executed.is_some();
        };
        let args = Self::reset_args(&self.command, parameter, args);
        handler(sender, args);
        args.can_execute
    }

    /// Attempt execution through this binding.
    ///
    /// A binding with no executed handler never claims the execution. When
    /// the binding has its own availability handler, that handler gates the
    /// attempt; a rejected attempt returns `false` so the walk can continue
    /// to an ancestor. On success the executed handler is posted to `queue`
    /// and `true` is returned.
    pub(crate) fn try_execute(
        &self,
        queue: &UiQueue,
        sender: ElementId,
        parameter: Option<&CommandParameter>,
        args: &mut Option<CanExecuteEventArgs>,
    ) -> bool {
        let Some(executed) = &self.executed else {
            return false;
        };

        let allowed = match &self.can_execute {
            Some(handler) => {
                let args = Self::reset_args(&self.command, parameter, args);
                handler(sender, args);
                args.can_execute
            }
            None => true,
        };
        if !allowed {
            return false;
        }

        let handler = executed.clone();
        let event = ExecutedEventArgs::new(self.command.clone(), parameter.cloned());
        queue.post(move || handler(sender, &event));
        true
    }

    fn reset_args<'a>(
        command: &CommandRef,
        parameter: Option<&CommandParameter>,
        args: &'a mut Option<CanExecuteEventArgs>,
    ) -> &'a mut CanExecuteEventArgs {
        let args = args
            .get_or_insert_with(|| CanExecuteEventArgs::new(command.clone(), parameter.cloned()));
        args.can_execute = false;
        args
    }
}

/// A gesture-to-command mapping registered on an element.
///
/// When dispatch finds a matching gesture while walking the tree, the
/// binding's command is invoked with the binding's parameter and target.
#[derive(Clone)]
pub struct InputBinding {
    command: CommandRef,
    gesture: InputGesture,
    parameter: Option<CommandParameter>,
    target: Option<ElementId>,
    /// When set, [`set_gesture`](Self::set_gesture) only accepts gestures of
    /// this kind.
    required_kind: Option<GestureKind>,
}

impl InputBinding {
    /// Create a binding accepting any gesture kind.
    pub fn new(command: impl Into<CommandRef>, gesture: impl Into<InputGesture>) -> Self {
        Self {
            command: command.into(),
            gesture: gesture.into(),
            parameter: None,
            target: None,
            required_kind: None,
        }
    }

    /// Create a key binding, constrained to key gestures.
    pub fn key(command: impl Into<CommandRef>, key: Key, modifiers: KeyboardModifiers) -> Self {
        Self::key_gesture(command, KeyGesture::with_modifiers(key, modifiers))
    }

    /// Create a binding from a key gesture, constrained to key gestures.
    pub fn key_gesture(command: impl Into<CommandRef>, gesture: KeyGesture) -> Self {
        let mut binding = Self::new(command, gesture);
        binding.required_kind = Some(GestureKind::Key);
        binding
    }

    /// Create a mouse binding, constrained to mouse gestures.
    pub fn mouse(command: impl Into<CommandRef>, action: MouseAction) -> Self {
        Self::mouse_gesture(command, MouseGesture::new(action))
    }

    /// Create a binding from a mouse gesture, constrained to mouse gestures.
    pub fn mouse_gesture(command: impl Into<CommandRef>, gesture: MouseGesture) -> Self {
        let mut binding = Self::new(command, gesture);
        binding.required_kind = Some(GestureKind::Mouse);
        binding
    }

    /// Set the parameter passed to the command on invocation.
    pub fn with_parameter(mut self, parameter: CommandParameter) -> Self {
        self.parameter = Some(parameter);
        self
    }

    /// Set an explicit routing target, overriding the active element.
    pub fn with_target(mut self, target: ElementId) -> Self {
        self.target = Some(target);
        self
    }

    /// The bound command.
    pub fn command(&self) -> &CommandRef {
        &self.command
    }

    /// The triggering gesture.
    pub fn gesture(&self) -> &InputGesture {
        &self.gesture
    }

    /// The invocation parameter, if any.
    pub fn parameter(&self) -> Option<&CommandParameter> {
        self.parameter.as_ref()
    }

    /// The explicit routing target, if any.
    pub fn target(&self) -> Option<ElementId> {
        self.target
    }

    /// Replace the triggering gesture.
    ///
    /// Kind-constrained bindings reject gestures of the other kind.
    pub fn set_gesture(&mut self, gesture: impl Into<InputGesture>) -> CommandResult<()> {
        let gesture = gesture.into();
        if let Some(expected) = self.required_kind {
            if gesture.kind() != expected {
                return Err(CommandError::GestureKindMismatch {
                    expected,
                    found: gesture.kind(),
                });
            }
        }
        self.gesture = gesture;
        Ok(())
    }
}

static_assertions::assert_impl_all!(CommandBinding: Send, Sync);
static_assertions::assert_impl_all!(InputBinding: Send, Sync);
