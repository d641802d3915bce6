//! Leak-safe multi-subscriber event channel.
//!
//! A long-lived command accumulates one enablement listener per attached UI
//! element. Elements are created and destroyed far more often than commands,
//! so the channel must never be the reason an element (or its attachment
//! state) survives past destruction: handlers are held through [`Weak`]
//! references and keyed by the owning element, and entries whose handler has
//! been dropped are pruned opportunistically during invocation.
//!
//! The subscriber keeps the strong [`Arc`] to its handler alongside its own
//! state; dropping that state is enough to silence the subscription even if
//! the owner never explicitly unsubscribed.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::ElementId;

/// The handler type stored by [`WeakEvent`].
pub type EventHandler<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

struct Entry<Args> {
    owner: ElementId,
    handler: Weak<dyn Fn(&Args) + Send + Sync>,
}

struct Inner<Args> {
    /// Handlers in subscription order; invocation iterates this list.
    handlers: Vec<Entry<Args>>,
    /// Live-entry count per owning element, for bulk removal.
    owners: HashMap<ElementId, usize>,
}

/// A multi-subscriber notification channel keyed by each subscriber's owner.
///
/// Each added handler is tracked two ways: an ordered list of weak references
/// (deterministic invocation order) and an owner-keyed index (bulk removal
/// when the owning element detaches or is destroyed). The channel holds no
/// strong reference to any handler.
pub struct WeakEvent<Args> {
    inner: Mutex<Inner<Args>>,
}

impl<Args> Default for WeakEvent<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> WeakEvent<Args> {
    /// Create a new empty channel.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                handlers: Vec::new(),
                owners: HashMap::new(),
            }),
        }
    }

    /// Add a handler owned by `owner`.
    ///
    /// Only a weak reference is retained; the caller must keep the `Arc`
    /// alive for as long as the subscription should deliver.
    pub fn add_handler(&self, owner: ElementId, handler: &EventHandler<Args>) {
        let mut inner = self.inner.lock();
        inner.handlers.push(Entry {
            owner,
            handler: Arc::downgrade(handler),
        });
        *inner.owners.entry(owner).or_insert(0) += 1;
    }

    /// Remove one handler by pointer identity.
    ///
    /// Returns `true` if the handler was found and removed.
    pub fn remove_handler(&self, handler: &EventHandler<Args>) -> bool {
        let mut inner = self.inner.lock();
        let target = Arc::as_ptr(handler);
        if let Some(pos) = inner
            .handlers
            .iter()
            .position(|e| std::ptr::addr_eq(e.handler.as_ptr(), target))
        {
            let entry = inner.handlers.remove(pos);
            Self::release_owner(&mut inner.owners, entry.owner);
            true
        } else {
            false
        }
    }

    /// Remove every handler added under `owner`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_owner(&self, owner: ElementId) -> usize {
        let mut inner = self.inner.lock();
        if inner.owners.remove(&owner).is_none() {
            return 0;
        }
        let before = inner.handlers.len();
        inner.handlers.retain(|e| e.owner != owner);
        before - inner.handlers.len()
    }

    /// Check whether the channel has no entries at all.
    ///
    /// Entries whose handler has already been dropped still count until they
    /// are pruned by [`invoke`](Self::invoke).
    pub fn is_empty(&self) -> bool {
        self.inner.lock().handlers.is_empty()
    }

    /// Number of entries whose handler is still alive.
    pub fn handler_count(&self) -> usize {
        self.inner
            .lock()
            .handlers
            .iter()
            .filter(|e| e.handler.strong_count() > 0)
            .count()
    }

    /// Invoke every live handler in subscription order.
    ///
    /// Entries whose handler can no longer be upgraded are pruned in place
    /// rather than causing a fault. Handlers run outside the channel lock, so
    /// they may add or remove subscriptions re-entrantly.
    pub fn invoke(&self, args: &Args) {
        let live: Vec<EventHandler<Args>> = {
            let mut inner = self.inner.lock();
            let mut live = Vec::with_capacity(inner.handlers.len());
            let mut dead = Vec::new();
            inner.handlers.retain(|e| match e.handler.upgrade() {
                Some(handler) => {
                    live.push(handler);
                    true
                }
                None => {
                    dead.push(e.owner);
                    false
                }
            });
            for owner in dead {
                Self::release_owner(&mut inner.owners, owner);
            }
            live
        };

        for handler in live {
            handler(args);
        }
    }

    fn release_owner(owners: &mut HashMap<ElementId, usize>, owner: ElementId) {
        if let Some(count) = owners.get_mut(&owner) {
            *count -= 1;
            if *count == 0 {
                owners.remove(&owner);
            }
        }
    }
}

static_assertions::assert_impl_all!(WeakEvent<()>: Send, Sync);
