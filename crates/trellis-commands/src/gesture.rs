//! Input gestures: key chords and mouse actions that trigger commands.
//!
//! Key gestures match their modifier set exactly (Ctrl+C must not fire on
//! Ctrl+Shift+C, which may be bound elsewhere). Mouse gestures match a
//! superset (Shift+LeftClick also satisfies a plain LeftClick gesture).

use trellis_core::ElementId;

use crate::input::{Key, KeyEvent, KeyboardModifiers, MouseAction};

/// The broad category of an [`InputGesture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// Keyboard chord.
    Key,
    /// Mouse action plus modifiers.
    Mouse,
}

impl std::fmt::Display for GestureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GestureKind::Key => write!(f, "key"),
            GestureKind::Mouse => write!(f, "mouse"),
        }
    }
}

/// A keyboard chord: one key plus a modifier set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGesture {
    key: Key,
    modifiers: KeyboardModifiers,
    display: Option<String>,
}

impl KeyGesture {
    /// Create a gesture for a bare key press.
    pub fn new(key: Key) -> Self {
        Self::with_modifiers(key, KeyboardModifiers::NONE)
    }

    /// Create a gesture for a key plus modifier chord.
    pub fn with_modifiers(key: Key, modifiers: KeyboardModifiers) -> Self {
        Self {
            key,
            modifiers,
            display: None,
        }
    }

    /// Attach a human-readable label (for menu item decoration).
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// The key this gesture fires on.
    pub fn key(&self) -> Key {
        self.key
    }

    /// The modifier chord this gesture requires.
    pub fn modifiers(&self) -> KeyboardModifiers {
        self.modifiers
    }

    /// The label, if one was attached.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Check whether `event` matches this gesture.
    ///
    /// The key must be equal and the modifier set must match exactly.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.key && self.modifiers == event.modifiers
    }
}

/// A mouse action plus a modifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseGesture {
    action: MouseAction,
    modifiers: KeyboardModifiers,
}

impl MouseGesture {
    /// Create a gesture for a bare mouse action.
    pub fn new(action: MouseAction) -> Self {
        Self::with_modifiers(action, KeyboardModifiers::NONE)
    }

    /// Create a gesture for a mouse action plus modifier chord.
    pub fn with_modifiers(action: MouseAction, modifiers: KeyboardModifiers) -> Self {
        Self { action, modifiers }
    }

    /// The mouse action this gesture fires on.
    pub fn action(&self) -> MouseAction {
        self.action
    }

    /// The modifier chord this gesture requires.
    pub fn modifiers(&self) -> KeyboardModifiers {
        self.modifiers
    }

    /// Check whether the observed action and held modifiers match.
    ///
    /// The action must be equal; the held modifiers need only contain the
    /// required ones. A gesture on [`MouseAction::None`] never matches.
    pub fn matches(&self, action: MouseAction, held: KeyboardModifiers) -> bool {
        self.action != MouseAction::None && self.action == action && held.contains(self.modifiers)
    }
}

/// Either kind of gesture, as stored on input bindings and routed commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputGesture {
    /// A keyboard chord.
    Key(KeyGesture),
    /// A mouse action.
    Mouse(MouseGesture),
}

impl InputGesture {
    /// The category of this gesture.
    pub fn kind(&self) -> GestureKind {
        match self {
            InputGesture::Key(_) => GestureKind::Key,
            InputGesture::Mouse(_) => GestureKind::Mouse,
        }
    }

    /// Match against a key event.
    ///
    /// Mouse gestures never match key input. The `target` the event is being
    /// routed at is accepted for parity with mouse matching but does not
    /// participate in the decision.
    pub fn matches_key(&self, _target: ElementId, event: &KeyEvent) -> bool {
        match self {
            InputGesture::Key(gesture) => gesture.matches(event),
            InputGesture::Mouse(_) => false,
        }
    }

    /// Match against a mouse action.
    ///
    /// Key gestures never match mouse input.
    pub fn matches_mouse(
        &self,
        _target: ElementId,
        action: MouseAction,
        held: KeyboardModifiers,
    ) -> bool {
        match self {
            InputGesture::Key(_) => false,
            InputGesture::Mouse(gesture) => gesture.matches(action, held),
        }
    }
}

impl From<KeyGesture> for InputGesture {
    fn from(gesture: KeyGesture) -> Self {
        InputGesture::Key(gesture)
    }
}

impl From<MouseGesture> for InputGesture {
    fn from(gesture: MouseGesture) -> Self {
        InputGesture::Mouse(gesture)
    }
}
