//! Tree-routed command identities.
//!
//! A [`RoutedCommand`] carries no behavior of its own: it is a named token
//! that [`crate::CommandBinding`]s on elements give meaning to, plus the
//! default gestures that trigger it and the availability-changed channel its
//! attachment points listen on.

use std::sync::OnceLock;

use parking_lot::Mutex;
use trellis_core::{ElementId, WeakEvent};

use crate::command::{CommandParameter, same_parameter};
use crate::gesture::InputGesture;

type GestureSource = Box<dyn Fn() -> Vec<InputGesture> + Send + Sync>;

/// Memoized availability result reused while one broadcast is in flight.
///
/// A broadcast fans out to every attachment point of this command; when many
/// of them share a target and parameter, the tree walk would otherwise repeat
/// identically for each. The cache lives only for the duration of a single
/// broadcast and keys on (parameter identity, target).
#[derive(Default)]
struct BroadcastCache {
    in_broadcast: bool,
    valid: bool,
    parameter: Option<CommandParameter>,
    target: Option<ElementId>,
    result: bool,
}

impl BroadcastCache {
    fn reset(&mut self) {
        self.in_broadcast = false;
        self.valid = false;
        self.parameter = None;
        self.target = None;
    }
}

/// A command identity resolved against the element tree.
///
/// Construct once, share via `Arc`, reference from bindings and attachment
/// points. Routing is performed by [`crate::CommandRouter`].
pub struct RoutedCommand {
    name: String,
    text: String,
    gestures: OnceLock<Vec<InputGesture>>,
    gesture_source: Option<GestureSource>,
    can_execute_changed: WeakEvent<()>,
    cache: Mutex<BroadcastCache>,
}

impl RoutedCommand {
    /// Create a command with no default gestures.
    ///
    /// `text` is the human-readable caption; `name` identifies the command in
    /// logs and debugging output.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn new(text: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "command name must not be empty");
        Self {
            name,
            text: text.into(),
            gestures: OnceLock::new(),
            gesture_source: None,
            can_execute_changed: WeakEvent::new(),
            cache: Mutex::new(BroadcastCache::default()),
        }
    }

    /// Create a command with a fixed set of default gestures.
    pub fn with_gestures(
        text: impl Into<String>,
        name: impl Into<String>,
        gestures: Vec<InputGesture>,
    ) -> Self {
        let command = Self::new(text, name);
        // A fresh OnceLock cannot already be set.
        let _ = command.gestures.set(gestures);
        command
    }

    /// Create a command whose default gestures are built lazily on first use.
    pub fn with_gesture_source<F>(
        text: impl Into<String>,
        name: impl Into<String>,
        source: F,
    ) -> Self
    where
        F: Fn() -> Vec<InputGesture> + Send + Sync + 'static,
    {
        let mut command = Self::new(text, name);
        command.gesture_source = Some(Box::new(source));
        command
    }

    /// The command's identifying name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command's human-readable caption.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The default gestures, if this command defines any.
    ///
    /// Materializes a lazy gesture source on first call. Returns `None` for
    /// commands constructed without gestures.
    pub fn try_input_gestures(&self) -> Option<&[InputGesture]> {
        if let Some(gestures) = self.gestures.get() {
            return Some(gestures);
        }
        let source = self.gesture_source.as_ref()?;
        Some(self.gestures.get_or_init(|| source()))
    }

    /// The default gestures, or an empty slice if none are defined.
    pub fn input_gestures(&self) -> &[InputGesture] {
        self.try_input_gestures().unwrap_or(&[])
    }

    /// The channel attachment points subscribe to for availability changes.
    ///
    /// Subscriptions are weak and keyed by the owning element; see
    /// [`WeakEvent`].
    pub fn can_execute_changed(&self) -> &WeakEvent<()> {
        &self.can_execute_changed
    }

    /// Notify every attachment point that availability may have changed.
    ///
    /// While the notification fans out, repeated availability queries for the
    /// same (parameter, target) pair are served from a one-slot cache instead
    /// of re-walking the tree. The cache is cleared when the broadcast
    /// finishes, even if a subscriber panics.
    pub fn raise_can_execute_changed(&self) {
        if self.can_execute_changed.is_empty() {
            return;
        }
        tracing::trace!(
            target: "trellis_commands::routed",
            command = %self.name,
            "broadcasting availability change"
        );

        {
            let mut cache = self.cache.lock();
            cache.in_broadcast = true;
            cache.valid = false;
            cache.parameter = None;
            cache.target = None;
        }
        let _guard = BroadcastGuard { cache: &self.cache };
        self.can_execute_changed.invoke(&());
    }

    /// Evaluate availability, consulting the broadcast cache when one is in
    /// flight.
    ///
    /// `compute` performs the actual tree resolution; it runs with the cache
    /// unlocked so it may recurse into this command.
    pub(crate) fn evaluate_with_cache(
        &self,
        parameter: Option<&CommandParameter>,
        target: ElementId,
        compute: impl FnOnce() -> bool,
    ) -> bool {
        {
            let cache = self.cache.lock();
            if !cache.in_broadcast {
                drop(cache);
                return compute();
            }
            if cache.valid
                && cache.target == Some(target)
                && same_parameter(cache.parameter.as_ref(), parameter)
            {
                return cache.result;
            }
        }

        let result = compute();

        let mut cache = self.cache.lock();
        if cache.in_broadcast {
            cache.valid = true;
            cache.parameter = parameter.cloned();
            cache.target = Some(target);
            cache.result = result;
        }
        result
    }
}

struct BroadcastGuard<'a> {
    cache: &'a Mutex<BroadcastCache>,
}

impl Drop for BroadcastGuard<'_> {
    fn drop(&mut self) {
        self.cache.lock().reset();
    }
}

impl std::fmt::Debug for RoutedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedCommand")
            .field("name", &self.name)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(RoutedCommand: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::KeyGesture;
    use crate::input::{Key, KeyboardModifiers};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trellis_core::{EventHandler, SharedElementRegistry};

    #[test]
    #[should_panic(expected = "command name must not be empty")]
    fn empty_name_is_rejected() {
        let _ = RoutedCommand::new("Close", "");
    }

    #[test]
    fn fixed_gestures_are_returned() {
        let command = RoutedCommand::with_gestures(
            "Copy",
            "copy",
            vec![KeyGesture::with_modifiers(Key::C, KeyboardModifiers::CTRL).into()],
        );

        assert_eq!(command.input_gestures().len(), 1);
        assert!(command.try_input_gestures().is_some());
    }

    #[test]
    fn gesture_source_runs_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let built_clone = built.clone();
        let command = RoutedCommand::with_gesture_source("Paste", "paste", move || {
            built_clone.fetch_add(1, Ordering::SeqCst);
            vec![KeyGesture::with_modifiers(Key::V, KeyboardModifiers::CTRL).into()]
        });

        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert_eq!(command.input_gestures().len(), 1);
        assert_eq!(command.input_gestures().len(), 1);
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn command_without_gestures_reports_none() {
        let command = RoutedCommand::new("Close", "close");
        assert!(command.try_input_gestures().is_none());
        assert!(command.input_gestures().is_empty());
    }

    #[test]
    fn broadcast_skips_when_channel_empty() {
        // Must not arm the cache or panic with no subscribers.
        let command = RoutedCommand::new("Close", "close");
        command.raise_can_execute_changed();

        let evaluated = AtomicUsize::new(0);
        let registry = SharedElementRegistry::new();
        let target = registry.register();
        command.evaluate_with_cache(None, target, || {
            evaluated.fetch_add(1, Ordering::SeqCst);
            true
        });
        command.evaluate_with_cache(None, target, || {
            evaluated.fetch_add(1, Ordering::SeqCst);
            true
        });
        // No broadcast in flight, so no caching between calls.
        assert_eq!(evaluated.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cache_is_armed_only_during_broadcast() {
        let registry = SharedElementRegistry::new();
        let owner = registry.register();
        let target = registry.register();
        let command = Arc::new(RoutedCommand::new("Save", "save"));

        let evaluated = Arc::new(AtomicUsize::new(0));
        let command_clone = command.clone();
        let evaluated_clone = evaluated.clone();
        let handler: EventHandler<()> = Arc::new(move |_| {
            // Two identical queries during the broadcast: second is cached.
            for _ in 0..2 {
                let evaluated = evaluated_clone.clone();
                let result = command_clone.evaluate_with_cache(None, target, move || {
                    evaluated.fetch_add(1, Ordering::SeqCst);
                    true
                });
                assert!(result);
            }
        });
        command.can_execute_changed().add_handler(owner, &handler);

        command.raise_can_execute_changed();
        assert_eq!(evaluated.load(Ordering::SeqCst), 1);

        // Broadcast over: queries compute again.
        let evaluated_after = evaluated.clone();
        command.evaluate_with_cache(None, target, move || {
            evaluated_after.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert_eq!(evaluated.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cache_distinguishes_targets_and_parameters() {
        let registry = SharedElementRegistry::new();
        let owner = registry.register();
        let target_a = registry.register();
        let target_b = registry.register();
        let command = Arc::new(RoutedCommand::new("Save", "save"));

        let evaluated = Arc::new(AtomicUsize::new(0));
        let command_clone = command.clone();
        let evaluated_clone = evaluated.clone();
        let handler: EventHandler<()> = Arc::new(move |_| {
            let parameter: CommandParameter = Arc::new(1_i32);
            for (param, target) in [
                (None, target_a),
                (None, target_a),
                (None, target_b),
                (Some(&parameter), target_b),
            ] {
                let evaluated = evaluated_clone.clone();
                command_clone.evaluate_with_cache(param, target, move || {
                    evaluated.fetch_add(1, Ordering::SeqCst);
                    true
                });
            }
        });
        command.can_execute_changed().add_handler(owner, &handler);

        command.raise_can_execute_changed();
        // target_a computed once, reused once; target_b and the parameterized
        // query each computed fresh.
        assert_eq!(evaluated.load(Ordering::SeqCst), 3);
    }
}
