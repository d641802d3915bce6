//! The command router: binding registries, tree resolution, input dispatch,
//! and the requery coalescer.
//!
//! One router serves one element tree. It owns the per-element command and
//! input binding lists, resolves routed command queries and executions by
//! walking the parent chain, and turns key/mouse input into command
//! invocations. All per-element state is purged automatically when the
//! element is destroyed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use trellis_core::{ElementId, SharedElementRegistry, UiQueue};

use crate::attachment::Attachment;
use crate::binding::{CanExecuteEventArgs, CommandBinding, InputBinding};
use crate::command::{CommandParameter, CommandRef};
use crate::error::{CommandError, CommandResult};
use crate::input::{KeyEvent, KeyboardModifiers, MouseAction};
use crate::routed::RoutedCommand;

/// Hierarchical command routing for one element tree.
///
/// Created with [`CommandRouter::new`]; always lives behind an [`Arc`] so
/// deferred work and destruction listeners can hold weak references back to
/// it.
pub struct CommandRouter {
    elements: Arc<SharedElementRegistry>,
    queue: Arc<UiQueue>,
    command_bindings: RwLock<HashMap<ElementId, Vec<CommandBinding>>>,
    input_bindings: RwLock<HashMap<ElementId, Vec<InputBinding>>>,
    pub(crate) attachments: RwLock<HashMap<ElementId, Attachment>>,
    /// Coalesces requery requests: set while a broadcast task is pending.
    requery_pending: AtomicBool,
    /// The top-level element whose active chain resolves implicit targets.
    active_root: Mutex<Option<ElementId>>,
    pub(crate) self_weak: Weak<CommandRouter>,
}

impl CommandRouter {
    /// Create a router over `elements`, deferring work to `queue`.
    ///
    /// The router subscribes to the registry's destruction signal and drops
    /// all bindings and attachments of destroyed elements.
    pub fn new(elements: Arc<SharedElementRegistry>, queue: Arc<UiQueue>) -> Arc<Self> {
        let router = Arc::new_cyclic(|self_weak| Self {
            elements: elements.clone(),
            queue,
            command_bindings: RwLock::new(HashMap::new()),
            input_bindings: RwLock::new(HashMap::new()),
            attachments: RwLock::new(HashMap::new()),
            requery_pending: AtomicBool::new(false),
            active_root: Mutex::new(None),
            self_weak: self_weak.clone(),
        });

        let weak = Arc::downgrade(&router);
        elements.destroyed().connect(move |&id| {
            if let Some(router) = weak.upgrade() {
                router.purge_element(id);
            }
        });

        router
    }

    /// The element registry this router resolves against.
    pub fn elements(&self) -> &Arc<SharedElementRegistry> {
        &self.elements
    }

    /// The queue executed handlers and requery broadcasts are posted to.
    pub fn queue(&self) -> &Arc<UiQueue> {
        &self.queue
    }

    // --- binding registries ---

    /// Register a command binding on `element`.
    pub fn add_command_binding(
        &self,
        element: ElementId,
        binding: CommandBinding,
    ) -> CommandResult<()> {
        self.ensure_element(element)?;
        self.command_bindings
            .write()
            .entry(element)
            .or_default()
            .push(binding);
        Ok(())
    }

    /// Number of command bindings registered on `element`.
    pub fn command_binding_count(&self, element: ElementId) -> usize {
        self.command_bindings
            .read()
            .get(&element)
            .map_or(0, Vec::len)
    }

    /// Remove every command binding on `element`. Returns how many were
    /// removed.
    pub fn clear_command_bindings(&self, element: ElementId) -> usize {
        self.command_bindings
            .write()
            .remove(&element)
            .map_or(0, |list| list.len())
    }

    /// Register an input binding on `element`.
    pub fn add_input_binding(
        &self,
        element: ElementId,
        binding: InputBinding,
    ) -> CommandResult<()> {
        self.ensure_element(element)?;
        self.input_bindings
            .write()
            .entry(element)
            .or_default()
            .push(binding);
        Ok(())
    }

    /// Number of input bindings registered on `element`.
    pub fn input_binding_count(&self, element: ElementId) -> usize {
        self.input_bindings.read().get(&element).map_or(0, Vec::len)
    }

    /// Remove every input binding on `element`. Returns how many were
    /// removed.
    pub fn clear_input_bindings(&self, element: ElementId) -> usize {
        self.input_bindings
            .write()
            .remove(&element)
            .map_or(0, |list| list.len())
    }

    // --- active element ---

    /// Set the top-level element whose active chain supplies implicit
    /// targets, or clear it.
    pub fn set_active_root(&self, root: Option<ElementId>) -> CommandResult<()> {
        if let Some(root) = root {
            self.ensure_element(root)?;
        }
        *self.active_root.lock() = root;
        Ok(())
    }

    /// The current active root, if set.
    pub fn active_root(&self) -> Option<ElementId> {
        *self.active_root.lock()
    }

    /// Resolve the implicit target: the innermost active element under the
    /// active root, or the root itself when it has no active chain.
    pub fn active_element(&self) -> Option<ElementId> {
        let root = (*self.active_root.lock())?;
        self.elements.active_leaf(root).ok().flatten().or(Some(root))
    }

    // --- routed command resolution ---

    /// Query whether `command` can execute at `target`.
    ///
    /// With no explicit target, the active element is used; with neither,
    /// the answer is `false`. The query runs a preview pass (root toward
    /// target) then a bubble pass (target toward root) over the bindings on
    /// the target chain; the first approving handler answers `true`, a
    /// handler that marks the query handled fixes the answer, and a chain
    /// with no opinion answers `false`.
    pub fn can_execute(
        &self,
        command: &Arc<RoutedCommand>,
        parameter: Option<&CommandParameter>,
        target: Option<ElementId>,
    ) -> bool {
        let Some(target) = target.or_else(|| self.active_element()) else {
            return false;
        };
        command.evaluate_with_cache(parameter, target, || {
            self.resolve_can_execute(command, parameter, target)
        })
    }

    fn resolve_can_execute(
        &self,
        command: &Arc<RoutedCommand>,
        parameter: Option<&CommandParameter>,
        target: ElementId,
    ) -> bool {
        let chain = self.collect_chain(command, target);
        if chain.is_empty() {
            return false;
        }

        let mut args: Option<CanExecuteEventArgs> = None;

        // Preview pass: outermost ancestor first.
        for (element, binding) in chain.iter().rev() {
            if binding.query_preview_can_execute(*element, parameter, &mut args) {
                return true;
            }
            if args.as_ref().is_some_and(|a| a.handled) {
                return false;
            }
        }

        // Bubble pass: target first.
        for (element, binding) in &chain {
            if binding.query_can_execute(*element, parameter, &mut args) {
                return true;
            }
            if args.as_ref().is_some_and(|a| a.handled) {
                return false;
            }
        }

        false
    }

    /// Execute `command` at `target`, unconditionally.
    ///
    /// Walks from the target upward; the first binding whose executed
    /// handler passes its own availability gate claims the execution, and
    /// its handler is posted to the queue. Bindings that reject are skipped
    /// and the walk continues. No preview pass runs; callers wanting the
    /// guarded form use [`execute_if_can`](Self::execute_if_can).
    pub fn execute(
        &self,
        command: &Arc<RoutedCommand>,
        parameter: Option<&CommandParameter>,
        target: Option<ElementId>,
    ) {
        let Some(target) = target.or_else(|| self.active_element()) else {
            return;
        };

        let chain = self.collect_chain(command, target);
        let mut args: Option<CanExecuteEventArgs> = None;
        for (element, binding) in &chain {
            if binding.try_execute(&self.queue, *element, parameter, &mut args) {
                tracing::debug!(
                    target: "trellis_commands::router",
                    command = %command.name(),
                    element = ?element,
                    "execution claimed"
                );
                return;
            }
        }
        tracing::debug!(
            target: "trellis_commands::router",
            command = %command.name(),
            "execution unclaimed"
        );
    }

    /// Execute `command` at `target` if the target chain allows it.
    ///
    /// Runs the preview pass first; a handled rejection stops everything.
    /// Then attempts execution from the target upward as in
    /// [`execute`](Self::execute). Returns whether a binding claimed the
    /// execution.
    pub fn execute_if_can(
        &self,
        command: &Arc<RoutedCommand>,
        parameter: Option<&CommandParameter>,
        target: Option<ElementId>,
    ) -> bool {
        let Some(target) = target.or_else(|| self.active_element()) else {
            return false;
        };

        let chain = self.collect_chain(command, target);
        if chain.is_empty() {
            return false;
        }

        let mut args: Option<CanExecuteEventArgs> = None;

        for (element, binding) in chain.iter().rev() {
            if binding.query_preview_can_execute(*element, parameter, &mut args) {
                break;
            }
            if args.as_ref().is_some_and(|a| a.handled) {
                return false;
            }
        }

        for (element, binding) in &chain {
            if binding.try_execute(&self.queue, *element, parameter, &mut args) {
                return true;
            }
        }
        false
    }

    /// Invoke either flavor of command as an input source would.
    ///
    /// Routed commands are executed through the tree at `target`; simple
    /// commands consult their own availability and ignore the target.
    pub fn invoke_command(
        &self,
        command: &CommandRef,
        parameter: Option<&CommandParameter>,
        target: Option<ElementId>,
    ) {
        match command {
            CommandRef::Routed(routed) => self.execute(routed, parameter, target),
            CommandRef::Simple(simple) => {
                if simple.can_execute(parameter) {
                    simple.execute(parameter);
                }
            }
        }
    }

    /// Bindings on the chain from `target` to its root, for `command`.
    ///
    /// Order is target-first. An element destroyed mid-walk ends the chain
    /// the same way a missing parent does.
    fn collect_chain(
        &self,
        command: &Arc<RoutedCommand>,
        target: ElementId,
    ) -> Vec<(ElementId, CommandBinding)> {
        let wanted = CommandRef::from(command);
        let mut chain = Vec::new();
        let bindings = self.command_bindings.read();
        let mut current = Some(target);
        while let Some(element) = current {
            if let Some(list) = bindings.get(&element) {
                for binding in list {
                    if *binding.command() == wanted {
                        chain.push((element, binding.clone()));
                    }
                }
            }
            current = self.elements.parent(element).ok().flatten();
        }
        chain
    }

    // --- input dispatch ---

    /// Route a key press from `origin` (or the active element).
    ///
    /// Walks the parent chain from the origin. On each element, input
    /// bindings are consulted first; a match posts the bound command's
    /// invocation to the queue, marks the event handled, and stops. Then the
    /// element's command bindings are scanned for routed commands whose
    /// default gestures match; a match attempts guarded execution, and a
    /// declined attempt continues the walk without retrying that command's
    /// remaining gestures.
    ///
    /// Returns `true` when a binding claimed the press. Already-handled
    /// events are ignored.
    pub fn dispatch_key(&self, origin: Option<ElementId>, event: &mut KeyEvent) -> bool {
        if event.is_handled() {
            return false;
        }
        let Some(origin) = origin.or_else(|| self.active_element()) else {
            return false;
        };
        tracing::trace!(
            target: "trellis_commands::router",
            ?origin,
            key = ?event.key,
            "dispatching key"
        );

        let mut current = Some(origin);
        while let Some(element) = current {
            let input: Vec<InputBinding> = self
                .input_bindings
                .read()
                .get(&element)
                .cloned()
                .unwrap_or_default();
            for binding in &input {
                if binding.gesture().matches_key(element, event) {
                    self.post_invocation(binding, element);
                    event.mark_handled();
                    return true;
                }
            }

            let commands: Vec<CommandBinding> = self
                .command_bindings
                .read()
                .get(&element)
                .cloned()
                .unwrap_or_default();
            for binding in &commands {
                let Some(routed) = binding.command().as_routed() else {
                    continue;
                };
                let Some(gestures) = routed.try_input_gestures() else {
                    continue;
                };
                for gesture in gestures {
                    if gesture.matches_key(element, event) {
                        if self.execute_if_can(routed, None, Some(element)) {
                            event.mark_handled();
                            return true;
                        }
                        // Declined; other gestures of this command would hit
                        // the same bindings.
                        break;
                    }
                }
            }

            current = self.elements.parent(element).ok().flatten();
        }
        false
    }

    /// Route a mouse action from `origin` (or the active element).
    ///
    /// Walks the parent chain consulting input bindings only; routed
    /// commands declare mouse gestures rarely enough that default-gesture
    /// scanning is keyboard-only. Returns `true` when a binding claimed the
    /// action.
    pub fn dispatch_mouse(
        &self,
        origin: Option<ElementId>,
        action: MouseAction,
        held: KeyboardModifiers,
    ) -> bool {
        let Some(origin) = origin.or_else(|| self.active_element()) else {
            return false;
        };
        tracing::trace!(
            target: "trellis_commands::router",
            ?origin,
            ?action,
            "dispatching mouse"
        );

        let mut current = Some(origin);
        while let Some(element) = current {
            let input: Vec<InputBinding> = self
                .input_bindings
                .read()
                .get(&element)
                .cloned()
                .unwrap_or_default();
            for binding in &input {
                if binding.gesture().matches_mouse(element, action, held) {
                    self.post_invocation(binding, element);
                    return true;
                }
            }
            current = self.elements.parent(element).ok().flatten();
        }
        false
    }

    /// Post the invocation of an input binding's command to the queue.
    ///
    /// The gesture handler returns before the command runs; the invocation
    /// targets the binding's explicit target, falling back to the element
    /// the binding matched on.
    fn post_invocation(&self, binding: &InputBinding, matched_on: ElementId) {
        let weak = self.self_weak.clone();
        let command = binding.command().clone();
        let parameter = binding.parameter().cloned();
        let target = binding.target().or(Some(matched_on));
        self.queue.post(move || {
            if let Some(router) = weak.upgrade() {
                router.invoke_command(&command, parameter.as_ref(), target);
            }
        });
    }

    // --- requery coalescing ---

    /// Request that every attached routed command re-announce availability.
    ///
    /// Any number of requests between queue drains collapse into a single
    /// broadcast task. The broadcast raises each distinct attached routed
    /// command's availability-changed channel once.
    pub fn request_requery(&self) {
        if self.requery_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let weak = self.self_weak.clone();
        self.queue.post(move || {
            if let Some(router) = weak.upgrade() {
                router.requery_pending.store(false, Ordering::SeqCst);
                router.broadcast_requery();
            }
        });
    }

    fn broadcast_requery(&self) {
        let commands: Vec<Arc<RoutedCommand>> = {
            let attachments = self.attachments.read();
            let mut seen: HashSet<*const RoutedCommand> = HashSet::new();
            let mut commands = Vec::new();
            for attachment in attachments.values() {
                if let CommandRef::Routed(command) = attachment.command() {
                    if seen.insert(Arc::as_ptr(command)) {
                        commands.push(command.clone());
                    }
                }
            }
            commands
        };

        tracing::debug!(
            target: "trellis_commands::router",
            count = commands.len(),
            "requery broadcast"
        );
        for command in commands {
            command.raise_can_execute_changed();
        }
    }

    // --- housekeeping ---

    pub(crate) fn ensure_element(&self, element: ElementId) -> CommandResult<()> {
        if self.elements.contains(element) {
            Ok(())
        } else {
            Err(CommandError::Element(
                trellis_core::ElementError::InvalidElementId,
            ))
        }
    }

    fn purge_element(&self, element: ElementId) {
        self.command_bindings.write().remove(&element);
        self.input_bindings.write().remove(&element);
        if let Some(attachment) = self.attachments.write().remove(&element) {
            self.teardown_attachment(element, &attachment);
        }
        let mut active_root = self.active_root.lock();
        if *active_root == Some(element) {
            *active_root = None;
        }
    }
}

static_assertions::assert_impl_all!(CommandRouter: Send, Sync);
