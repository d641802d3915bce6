//! Stock application commands.
//!
//! Process-wide routed command identities for the usual application verbs.
//! Each accessor returns the same instance every time, so bindings and
//! attachments made anywhere in the process agree on identity.

use std::sync::{Arc, OnceLock};

use crate::gesture::KeyGesture;
use crate::input::{Key, KeyboardModifiers};
use crate::routed::RoutedCommand;

macro_rules! standard_command {
    ($(#[$doc:meta])* $fn_name:ident, $slot:ident, $text:expr, $name:expr $(, $gesture:expr)*) => {
        $(#[$doc])*
        pub fn $fn_name() -> Arc<RoutedCommand> {
            static $slot: OnceLock<Arc<RoutedCommand>> = OnceLock::new();
            $slot
                .get_or_init(|| {
                    Arc::new(RoutedCommand::with_gestures(
                        $text,
                        $name,
                        vec![$($gesture.into()),*],
                    ))
                })
                .clone()
        }
    };
}

standard_command!(
    /// Close the active document or window. No default gesture.
    close, CLOSE, "Close", "close"
);

standard_command!(
    /// Print the active document. Ctrl+P.
    print, PRINT, "Print", "print",
    KeyGesture::with_modifiers(Key::P, KeyboardModifiers::CTRL)
);

standard_command!(
    /// Show a print preview of the active document. Ctrl+F2.
    print_preview, PRINT_PREVIEW, "Print Preview", "print_preview",
    KeyGesture::with_modifiers(Key::F2, KeyboardModifiers::CTRL)
);

standard_command!(
    /// Copy the selection to the clipboard. Ctrl+C.
    copy, COPY, "Copy", "copy",
    KeyGesture::with_modifiers(Key::C, KeyboardModifiers::CTRL)
);

standard_command!(
    /// Cut the selection to the clipboard. Ctrl+X.
    cut, CUT, "Cut", "cut",
    KeyGesture::with_modifiers(Key::X, KeyboardModifiers::CTRL)
);

standard_command!(
    /// Paste the clipboard at the caret. Ctrl+V.
    paste, PASTE, "Paste", "paste",
    KeyGesture::with_modifiers(Key::V, KeyboardModifiers::CTRL)
);
