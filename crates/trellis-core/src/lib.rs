//! Core systems for Trellis.
//!
//! This crate provides the host-framework primitives the Trellis command
//! system is built on:
//!
//! - **Element Tree**: Arena-backed parent/child registry with visibility,
//!   enabled state, the active-child (focus) chain, and cascade destroy with
//!   destruction notifications
//! - **Signal/Slot System**: Type-safe synchronous notification
//! - **Weak Event Channel**: Owner-keyed, leak-safe multi-subscriber channel
//! - **UI Task Queue**: FIFO deferred execution on the UI thread
//!
//! # Element Tree Example
//!
//! ```
//! use trellis_core::SharedElementRegistry;
//!
//! let registry = SharedElementRegistry::new();
//! let window = registry.register();
//! let button = registry.register_child(window).unwrap();
//!
//! registry.destroyed().connect(|&id| {
//!     println!("element {:?} destroyed", id);
//! });
//!
//! registry.destroy(window).unwrap();
//! assert!(!registry.contains(button));
//! ```
//!
//! # Signal Example
//!
//! ```
//! use trellis_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod element;
pub mod logging;
pub mod queue;
pub mod signal;
pub mod weak_event;

pub use element::{ElementError, ElementId, ElementRegistry, ElementResult, SharedElementRegistry};
pub use queue::{TaskId, UiQueue};
pub use signal::{ConnectionId, Signal};
pub use weak_event::{EventHandler, WeakEvent};
