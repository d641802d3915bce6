//! Hierarchical command routing for Trellis element trees.
//!
//! Commands decouple "what should happen" from "which widget asked for it".
//! This crate provides both flavors and the machinery around them:
//!
//! - **Commands**: self-contained [`Command`]/[`FnCommand`], and
//!   tree-routed [`RoutedCommand`] identities whose behavior lives in
//!   bindings on elements
//! - **Bindings**: [`CommandBinding`] handlers that answer availability
//!   queries and claim executions, and [`InputBinding`] gesture triggers
//! - **Routing**: the [`CommandRouter`] resolves queries and executions by
//!   walking the element tree (preview pass down, bubble pass up) and
//!   dispatches key and mouse input to bindings
//! - **Attachment**: [`CommandHost`] couples widgets to commands so enabled
//!   state tracks availability and activation executes
//! - **Standard commands**: [`standard`] holds the stock application verbs
//!   (copy, cut, paste, print, ...) with their default gestures
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{SharedElementRegistry, UiQueue};
//! use trellis_commands::{CommandBinding, CommandRouter, RoutedCommand};
//!
//! let elements = Arc::new(SharedElementRegistry::new());
//! let queue = Arc::new(UiQueue::new());
//! let router = CommandRouter::new(elements.clone(), queue.clone());
//!
//! let window = elements.register();
//! let editor = elements.register_child(window).unwrap();
//!
//! let save = Arc::new(RoutedCommand::new("Save", "save"));
//! router
//!     .add_command_binding(
//!         window,
//!         CommandBinding::new(&save)
//!             .with_executed(|_, _| println!("saved"))
//!             .with_can_execute(|_, args| args.can_execute = true),
//!     )
//!     .unwrap();
//!
//! // The binding on the window answers for the whole subtree.
//! assert!(router.can_execute(&save, None, Some(editor)));
//! router.execute(&save, None, Some(editor));
//! queue.process_all();
//! ```

pub mod attachment;
pub mod binding;
pub mod command;
pub mod error;
pub mod gesture;
pub mod input;
pub mod routed;
pub mod router;
pub mod standard;

pub use attachment::CommandHost;
pub use binding::{
    CanExecuteEventArgs, CommandBinding, ExecutedEventArgs, InputBinding,
};
pub use command::{Command, CommandParameter, CommandRef, FnCommand};
pub use error::{CommandError, CommandResult};
pub use gesture::{GestureKind, InputGesture, KeyGesture, MouseGesture};
pub use input::{Key, KeyEvent, KeyboardModifiers, MouseAction};
pub use routed::RoutedCommand;
pub use router::CommandRouter;
