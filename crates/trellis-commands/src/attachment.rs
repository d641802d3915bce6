//! Command attachment: wiring a command to a UI element that invokes it.
//!
//! An attachment couples an element (button, menu item, tool strip entry)
//! to a command so that the element's enabled state mirrors the command's
//! availability and activating the element executes the command. The
//! element side of the coupling is expressed through the [`CommandHost`]
//! trait; the router keeps the subscription plumbing.

use std::sync::Arc;

use trellis_core::{ConnectionId, ElementId, EventHandler};

use crate::command::{CommandParameter, CommandRef};
use crate::error::CommandResult;
use crate::router::CommandRouter;

/// The widget-side surface of a command attachment.
///
/// Implemented by whatever owns the concrete widget. The router calls
/// [`set_enabled`](Self::set_enabled) whenever the attached command's
/// availability is recomputed.
pub trait CommandHost: Send + Sync {
    /// Reflect the command's availability on the widget.
    fn set_enabled(&self, enabled: bool);

    /// Whether the widget currently participates in availability updates.
    ///
    /// Hidden widgets typically return `false`; their enabled state is
    /// refreshed when they report availability again via
    /// [`CommandRouter::refresh_attachment`].
    fn is_available(&self) -> bool {
        true
    }

    /// The element the widget belongs to, for implicit target resolution.
    ///
    /// When the attachment has no explicit target, a routed command is
    /// resolved at the active leaf of this element's root.
    fn source_element(&self) -> Option<ElementId> {
        None
    }
}

/// Per-element attachment state held by the router.
pub(crate) struct Attachment {
    command: CommandRef,
    parameter: Option<CommandParameter>,
    target: Option<ElementId>,
    host: Arc<dyn CommandHost>,
    /// Strong end of the weak availability subscription; dropping the
    /// attachment silences it even without explicit removal.
    _routed_listener: Option<EventHandler<()>>,
    simple_connection: Option<ConnectionId>,
}

impl Attachment {
    pub(crate) fn command(&self) -> &CommandRef {
        &self.command
    }
}

impl CommandRouter {
    /// Attach `command` to `element`.
    ///
    /// Replaces any previous attachment: the old command is unsubscribed and
    /// the host re-enabled before the new command takes over. The host's
    /// enabled state is recomputed immediately from the new command.
    pub fn attach_command(
        &self,
        element: ElementId,
        command: impl Into<CommandRef>,
        parameter: Option<CommandParameter>,
        target: Option<ElementId>,
        host: Arc<dyn CommandHost>,
    ) -> CommandResult<()> {
        self.ensure_element(element)?;
        let command = command.into();
        tracing::debug!(
            target: "trellis_commands::attachment",
            ?element,
            ?command,
            "attaching command"
        );

        let old = self.attachments.write().remove(&element);
        if let Some(old) = old {
            self.teardown_attachment(element, &old);
            old.host.set_enabled(true);
        }

        let mut routed_listener = None;
        let mut simple_connection = None;
        match &command {
            CommandRef::Routed(routed) => {
                let listener: EventHandler<()> = {
                    let weak = self.self_weak.clone();
                    Arc::new(move |_| {
                        if let Some(router) = weak.upgrade() {
                            router.refresh_attachment(element);
                        }
                    })
                };
                routed.can_execute_changed().add_handler(element, &listener);
                routed_listener = Some(listener);
            }
            CommandRef::Simple(simple) => {
                let weak = self.self_weak.clone();
                simple_connection = Some(simple.can_execute_changed().connect(move |_| {
                    if let Some(router) = weak.upgrade() {
                        router.refresh_attachment(element);
                    }
                }));
            }
        }

        self.attachments.write().insert(
            element,
            Attachment {
                command,
                parameter,
                target,
                host,
                _routed_listener: routed_listener,
                simple_connection,
            },
        );

        self.refresh_attachment(element);
        Ok(())
    }

    /// Detach whatever command is attached to `element`.
    ///
    /// The host is re-enabled; a detached widget is an ordinary widget
    /// again. Returns whether an attachment existed.
    pub fn detach_command(&self, element: ElementId) -> bool {
        let Some(attachment) = self.attachments.write().remove(&element) else {
            return false;
        };
        tracing::debug!(
            target: "trellis_commands::attachment",
            ?element,
            "detaching command"
        );
        self.teardown_attachment(element, &attachment);
        attachment.host.set_enabled(true);
        true
    }

    /// The command attached to `element`, if any.
    pub fn command_of(&self, element: ElementId) -> Option<CommandRef> {
        self.attachments
            .read()
            .get(&element)
            .map(|a| a.command.clone())
    }

    /// Recompute the host's enabled state from the attached command.
    ///
    /// Called automatically on attach and whenever the command announces an
    /// availability change; the host calls it itself when it becomes
    /// available again (e.g. on becoming visible). Unavailable hosts are
    /// left untouched.
    pub fn refresh_attachment(&self, element: ElementId) {
        let snapshot = {
            let attachments = self.attachments.read();
            attachments.get(&element).map(|a| {
                (
                    a.command.clone(),
                    a.parameter.clone(),
                    a.target,
                    a.host.clone(),
                )
            })
        };
        let Some((command, parameter, target, host)) = snapshot else {
            return;
        };
        if !host.is_available() {
            return;
        }

        let enabled = match &command {
            CommandRef::Routed(routed) => {
                let target = target.or_else(|| self.source_target(&*host));
                self.can_execute(routed, parameter.as_ref(), target)
            }
            CommandRef::Simple(simple) => simple.can_execute(parameter.as_ref()),
        };
        host.set_enabled(enabled);
    }

    /// Invoke the command attached to `element`, as if the widget was
    /// activated (clicked).
    ///
    /// Routed commands go through guarded execution at the attachment's
    /// target; simple commands consult their own availability. Returns
    /// whether the command was (or, for routed commands, will be) executed.
    pub fn activate(&self, element: ElementId) -> bool {
        let snapshot = {
            let attachments = self.attachments.read();
            attachments.get(&element).map(|a| {
                (
                    a.command.clone(),
                    a.parameter.clone(),
                    a.target,
                    a.host.clone(),
                )
            })
        };
        let Some((command, parameter, target, host)) = snapshot else {
            return false;
        };

        match &command {
            CommandRef::Routed(routed) => {
                let target = target.or_else(|| self.source_target(&*host));
                self.execute_if_can(routed, parameter.as_ref(), target)
            }
            CommandRef::Simple(simple) => {
                if simple.can_execute(parameter.as_ref()) {
                    simple.execute(parameter.as_ref());
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Resolve a host's implicit target: the active leaf under the root of
    /// its source element.
    fn source_target(&self, host: &dyn CommandHost) -> Option<ElementId> {
        let source = host.source_element()?;
        let root = self
            .elements()
            .ancestors(source)
            .ok()?
            .last()
            .copied()
            .unwrap_or(source);
        self.elements().active_leaf(root).ok().flatten().or(Some(root))
    }

    /// Drop the availability subscription of a removed attachment.
    pub(crate) fn teardown_attachment(&self, element: ElementId, attachment: &Attachment) {
        match &attachment.command {
            CommandRef::Routed(routed) => {
                routed.can_execute_changed().remove_owner(element);
            }
            CommandRef::Simple(simple) => {
                if let Some(connection) = attachment.simple_connection {
                    simple.can_execute_changed().disconnect(connection);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::CommandBinding;
    use crate::command::{Command, FnCommand};
    use crate::routed::RoutedCommand;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use trellis_core::{SharedElementRegistry, UiQueue};

    struct TestHost {
        enabled_log: Mutex<Vec<bool>>,
        available: AtomicBool,
        source: Option<ElementId>,
    }

    impl TestHost {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                enabled_log: Mutex::new(Vec::new()),
                available: AtomicBool::new(true),
                source: None,
            })
        }

        fn last_enabled(&self) -> Option<bool> {
            self.enabled_log.lock().last().copied()
        }
    }

    impl CommandHost for TestHost {
        fn set_enabled(&self, enabled: bool) {
            self.enabled_log.lock().push(enabled);
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn source_element(&self) -> Option<ElementId> {
            self.source
        }
    }

    fn fixture() -> (Arc<SharedElementRegistry>, Arc<UiQueue>, Arc<CommandRouter>) {
        let elements = Arc::new(SharedElementRegistry::new());
        let queue = Arc::new(UiQueue::new());
        let router = CommandRouter::new(elements.clone(), queue.clone());
        (elements, queue, router)
    }

    #[test]
    fn attach_recomputes_enabled_immediately() {
        let (elements, _queue, router) = fixture();
        let button = elements.register();
        let command = Arc::new(RoutedCommand::new("Save", "save"));
        let host = TestHost::new();

        // No bindings anywhere: unavailable.
        router
            .attach_command(button, &command, None, Some(button), host.clone())
            .unwrap();
        assert_eq!(host.last_enabled(), Some(false));
    }

    #[test]
    fn availability_change_reaches_host() {
        let (elements, _queue, router) = fixture();
        let window = elements.register();
        let button = elements.register_child(window).unwrap();
        let command = Arc::new(RoutedCommand::new("Save", "save"));
        let host = TestHost::new();

        let armed = Arc::new(AtomicBool::new(false));
        let armed_clone = armed.clone();
        router
            .add_command_binding(
                window,
                CommandBinding::new(&command).with_can_execute(move |_, args| {
                    args.can_execute = armed_clone.load(Ordering::SeqCst);
                }),
            )
            .unwrap();

        router
            .attach_command(button, &command, None, Some(button), host.clone())
            .unwrap();
        assert_eq!(host.last_enabled(), Some(false));

        armed.store(true, Ordering::SeqCst);
        command.raise_can_execute_changed();
        assert_eq!(host.last_enabled(), Some(true));
    }

    #[test]
    fn replacing_attachment_reenables_then_recomputes() {
        let (elements, _queue, router) = fixture();
        let button = elements.register();
        let old = Arc::new(RoutedCommand::new("Save", "save"));
        let new = Arc::new(RoutedCommand::new("Open", "open"));
        let host = TestHost::new();

        router
            .attach_command(button, &old, None, Some(button), host.clone())
            .unwrap();
        router
            .attach_command(button, &new, None, Some(button), host.clone())
            .unwrap();

        // false (old, unavailable), true (reset on replace), false (new).
        assert_eq!(*host.enabled_log.lock(), vec![false, true, false]);
        assert_eq!(old.can_execute_changed().handler_count(), 0);
        assert_eq!(new.can_execute_changed().handler_count(), 1);
        assert_eq!(router.command_of(button), Some(CommandRef::from(&new)));
    }

    #[test]
    fn detach_reenables_host_and_unsubscribes() {
        let (elements, _queue, router) = fixture();
        let button = elements.register();
        let command = Arc::new(RoutedCommand::new("Save", "save"));
        let host = TestHost::new();

        router
            .attach_command(button, &command, None, Some(button), host.clone())
            .unwrap();
        assert!(router.detach_command(button));
        assert!(!router.detach_command(button));

        assert_eq!(host.last_enabled(), Some(true));
        assert_eq!(command.can_execute_changed().handler_count(), 0);
        assert_eq!(router.command_of(button), None);
    }

    #[test]
    fn unavailable_host_is_not_updated() {
        let (elements, _queue, router) = fixture();
        let button = elements.register();
        let command = Arc::new(RoutedCommand::new("Save", "save"));
        let host = TestHost::new();
        host.available.store(false, Ordering::SeqCst);

        router
            .attach_command(button, &command, None, Some(button), host.clone())
            .unwrap();
        assert!(host.enabled_log.lock().is_empty());

        // Back in the game: the host asks for a refresh itself.
        host.available.store(true, Ordering::SeqCst);
        router.refresh_attachment(button);
        assert_eq!(host.last_enabled(), Some(false));
    }

    #[test]
    fn destroying_element_drops_attachment_and_subscription() {
        let (elements, _queue, router) = fixture();
        let button = elements.register();
        let command = Arc::new(RoutedCommand::new("Save", "save"));
        let host = TestHost::new();

        router
            .attach_command(button, &command, None, Some(button), host.clone())
            .unwrap();
        assert_eq!(command.can_execute_changed().handler_count(), 1);

        elements.destroy(button).unwrap();
        assert_eq!(command.can_execute_changed().handler_count(), 0);
        assert_eq!(router.command_of(button), None);
        // No re-enable on destruction; the widget is gone.
        assert_eq!(host.last_enabled(), Some(false));
    }

    #[test]
    fn simple_command_attachment_tracks_its_signal() {
        let (elements, _queue, router) = fixture();
        let button = elements.register();
        let armed = Arc::new(AtomicBool::new(false));
        let armed_clone = armed.clone();
        let command = Arc::new(FnCommand::with_can_execute(
            |_| {},
            move |_| armed_clone.load(Ordering::SeqCst),
        ));
        let host = TestHost::new();

        router
            .attach_command(button, command.clone(), None, None, host.clone())
            .unwrap();
        assert_eq!(host.last_enabled(), Some(false));

        armed.store(true, Ordering::SeqCst);
        command.raise_can_execute_changed();
        assert_eq!(host.last_enabled(), Some(true));

        router.detach_command(button);
        assert_eq!(command.can_execute_changed().connection_count(), 0);
    }

    #[test]
    fn activate_runs_simple_command_inline() {
        let (elements, _queue, router) = fixture();
        let button = elements.register();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let command = Arc::new(FnCommand::new(move |_| {
            ran_clone.store(true, Ordering::SeqCst);
        }));

        router
            .attach_command(button, command, None, None, TestHost::new())
            .unwrap();
        assert!(router.activate(button));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn activate_routes_through_tree() {
        let (elements, queue, router) = fixture();
        let window = elements.register();
        let button = elements.register_child(window).unwrap();
        let command = Arc::new(RoutedCommand::new("Save", "save"));
        let ran = Arc::new(AtomicBool::new(false));

        let ran_clone = ran.clone();
        router
            .add_command_binding(
                window,
                CommandBinding::new(&command).with_executed(move |_, _| {
                    ran_clone.store(true, Ordering::SeqCst);
                }),
            )
            .unwrap();
        router
            .attach_command(button, &command, None, Some(button), TestHost::new())
            .unwrap();

        assert!(router.activate(button));
        queue.process_all();
        assert!(ran.load(Ordering::SeqCst));
    }
}
