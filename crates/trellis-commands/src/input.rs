//! Input primitives consumed from the host framework.
//!
//! The command system never talks to a windowing backend directly; the host
//! translates native key and mouse events into these types and hands them to
//! [`crate::CommandRouter::dispatch_key`] /
//! [`crate::CommandRouter::dispatch_mouse`].

/// Keyboard modifiers that may be held during input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KeyboardModifiers {
    /// The Shift key is held.
    pub shift: bool,
    /// The Control key is held (Cmd on macOS).
    pub control: bool,
    /// The Alt key is held (Option on macOS).
    pub alt: bool,
    /// The Meta/Super key is held (Windows key, Cmd on macOS).
    pub meta: bool,
}

impl KeyboardModifiers {
    /// No modifiers pressed.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    /// Shift modifier only.
    pub const SHIFT: Self = Self {
        shift: true,
        control: false,
        alt: false,
        meta: false,
    };

    /// Control modifier only.
    pub const CTRL: Self = Self {
        shift: false,
        control: true,
        alt: false,
        meta: false,
    };

    /// Alt modifier only.
    pub const ALT: Self = Self {
        shift: false,
        control: false,
        alt: true,
        meta: false,
    };

    /// Meta modifier only.
    pub const META: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: true,
    };

    /// Control + Shift modifiers.
    pub const CTRL_SHIFT: Self = Self {
        shift: true,
        control: true,
        alt: false,
        meta: false,
    };

    /// Check if any modifier is pressed.
    pub fn any(&self) -> bool {
        self.shift || self.control || self.alt || self.meta
    }

    /// Check if no modifiers are pressed.
    pub fn none(&self) -> bool {
        !self.any()
    }

    /// Check if every modifier in `required` is also held in `self`.
    ///
    /// Extra held modifiers do not matter; this is the superset test mouse
    /// gestures match with.
    pub fn contains(&self, required: Self) -> bool {
        (!required.shift || self.shift)
            && (!required.control || self.control)
            && (!required.alt || self.alt)
            && (!required.meta || self.meta)
    }
}

/// Physical keys recognized by key gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[rustfmt::skip]
pub enum Key {
    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Numbers (main keyboard)
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    // Function keys
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,

    // Navigation
    ArrowUp, ArrowDown, ArrowLeft, ArrowRight,
    Home, End, PageUp, PageDown,

    // Editing
    Backspace, Delete, Insert,
    Enter, Tab,

    // Whitespace
    Space,

    // Control
    Escape,

    // Unknown/unmapped key
    Unknown(u16),
}

/// Mouse actions recognized by mouse gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseAction {
    /// No action; a gesture configured with this never matches.
    #[default]
    None,
    /// Primary button click.
    LeftClick,
    /// Secondary button click.
    RightClick,
    /// Middle button click.
    MiddleClick,
    /// Scroll wheel click.
    WheelClick,
    /// Primary button double click.
    LeftDoubleClick,
    /// Secondary button double click.
    RightDoubleClick,
    /// Middle button double click.
    MiddleDoubleClick,
}

/// A key press delivered by the host framework.
///
/// Carries the pressed key, the modifier set held at press time, and a
/// mutable handled flag. Dispatch marks the event handled when a binding
/// claims it; the host suppresses further native processing for handled
/// events.
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    /// The pressed key.
    pub key: Key,
    /// The modifiers held at press time.
    pub modifiers: KeyboardModifiers,
    /// Whether a binding has claimed the event.
    handled: bool,
}

impl KeyEvent {
    /// Create a new unhandled key event.
    pub fn new(key: Key, modifiers: KeyboardModifiers) -> Self {
        Self {
            key,
            modifiers,
            handled: false,
        }
    }

    /// Check if the event has been claimed.
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Claim the event, suppressing further processing.
    pub fn mark_handled(&mut self) {
        self.handled = true;
    }
}
