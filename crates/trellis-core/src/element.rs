//! Element tree registry for Trellis.
//!
//! Provides the host-framework side of the command system:
//! - Unique element identifiers via arena-based storage
//! - Parent-child relationships with cascade destroy
//! - Per-element visibility, enabled state, and the active-child chain
//! - A destruction notification consumers can subscribe to
//!
//! # Key Types
//!
//! - [`ElementId`] - Unique stable identifier for each element
//! - [`ElementRegistry`] - Central registry managing the tree
//! - [`SharedElementRegistry`] - Thread-safe wrapper around [`ElementRegistry`]
//!
//! # Related Modules
//!
//! - [`crate::Signal`] - Carries the [`destroyed`](SharedElementRegistry::destroyed) notification
//! - [`crate::WeakEvent`] - Listener channels keyed by element identity

use std::fmt;

use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for an element in the registry.
    ///
    /// `ElementId`s are stable handles that remain valid as the tree changes.
    /// They become invalid when the element is destroyed and never resolve
    /// again afterwards.
    pub struct ElementId;
}

/// Errors that can occur during element operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementError {
    /// The element ID is invalid or the element has been destroyed.
    InvalidElementId,
    /// Attempted to set an element as its own parent/ancestor.
    CircularParentage,
    /// The active child must be a direct child of the element (or the element itself).
    NotAChild,
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidElementId => write!(f, "Invalid or destroyed element ID"),
            Self::CircularParentage => {
                write!(f, "Cannot set an element as its own parent or ancestor")
            }
            Self::NotAChild => {
                write!(f, "Active child must be a direct child of the element")
            }
        }
    }
}

impl std::error::Error for ElementError {}

/// Result type for element operations.
pub type ElementResult<T> = std::result::Result<T, ElementError>;

/// Internal data stored in the registry for each element.
struct ElementData {
    /// Human-readable name for debugging and lookup.
    name: String,
    /// Parent element (if any).
    parent: Option<ElementId>,
    /// Child elements, in creation/stacking order.
    children: Vec<ElementId>,
    /// Whether the element is shown (its own state, not considering ancestors).
    visible: bool,
    /// Whether the element accepts input (its own state, not considering ancestors).
    enabled: bool,
    /// The child that currently holds focus within this element, if any.
    ///
    /// A value equal to the element's own id marks a leaf that terminates
    /// the active-child chain.
    active_child: Option<ElementId>,
}

impl ElementData {
    fn new() -> Self {
        Self {
            name: String::new(),
            parent: None,
            children: Vec::new(),
            visible: true,
            enabled: true,
            active_child: None,
        }
    }
}

/// The central registry that manages all elements and their relationships.
///
/// Uses arena-based storage via SlotMap for stable element IDs and efficient
/// parent-child relationship management. Commands, bindings, and attachments
/// reference elements exclusively through [`ElementId`], so a destroyed
/// element can never be reached through a stale handle.
pub struct ElementRegistry {
    elements: SlotMap<ElementId, ElementData>,
}

impl ElementRegistry {
    /// Create a new empty element registry.
    pub fn new() -> Self {
        Self {
            elements: SlotMap::with_key(),
        }
    }

    /// Register a new root element and return its ID.
    pub fn register(&mut self) -> ElementId {
        let id = self.elements.insert(ElementData::new());
        tracing::trace!(target: "trellis_core::element", ?id, "registered element");
        id
    }

    /// Register a new element as a child of `parent`.
    pub fn register_child(&mut self, parent: ElementId) -> ElementResult<ElementId> {
        if !self.elements.contains_key(parent) {
            return Err(ElementError::InvalidElementId);
        }
        let id = self.register();
        self.set_parent(id, Some(parent))?;
        Ok(id)
    }

    /// Remove an element and all its descendants from the registry.
    ///
    /// Returns the destroyed IDs in children-first order (descendants before
    /// the element itself), matching the order destruction notifications are
    /// delivered in.
    pub fn destroy(&mut self, id: ElementId) -> ElementResult<Vec<ElementId>> {
        let mut destroyed = self.collect_descendants(id)?;
        tracing::trace!(
            target: "trellis_core::element",
            ?id,
            descendant_count = destroyed.len(),
            "destroying element tree"
        );

        // Remove from the parent's children list.
        if let Some(data) = self.elements.get(id) {
            if let Some(parent_id) = data.parent {
                if let Some(parent_data) = self.elements.get_mut(parent_id) {
                    parent_data.children.retain(|&child| child != id);
                    if parent_data.active_child == Some(id) {
                        parent_data.active_child = None;
                    }
                }
            }
        }

        for &child_id in &destroyed {
            self.elements.remove(child_id);
        }
        self.elements.remove(id);
        destroyed.push(id);

        Ok(destroyed)
    }

    /// Collect all descendant IDs in depth-first order (children before parents).
    fn collect_descendants(&self, id: ElementId) -> ElementResult<Vec<ElementId>> {
        let mut result = Vec::new();
        self.collect_descendants_recursive(id, &mut result)?;
        Ok(result)
    }

    fn collect_descendants_recursive(
        &self,
        id: ElementId,
        result: &mut Vec<ElementId>,
    ) -> ElementResult<()> {
        let data = self.elements.get(id).ok_or(ElementError::InvalidElementId)?;
        for &child_id in &data.children {
            self.collect_descendants_recursive(child_id, result)?;
            result.push(child_id);
        }
        Ok(())
    }

    /// Check if an element exists in the registry.
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Set the parent of an element.
    ///
    /// This handles removing from the old parent and adding to the new parent.
    /// Passing `None` makes the element a root element.
    pub fn set_parent(&mut self, id: ElementId, new_parent: Option<ElementId>) -> ElementResult<()> {
        if !self.elements.contains_key(id) {
            return Err(ElementError::InvalidElementId);
        }

        if let Some(parent_id) = new_parent {
            if !self.elements.contains_key(parent_id) {
                return Err(ElementError::InvalidElementId);
            }
            if self.is_ancestor_of(id, parent_id)? {
                return Err(ElementError::CircularParentage);
            }
        }

        let old_parent = self.elements.get(id).and_then(|d| d.parent);
        if let Some(old_parent_id) = old_parent {
            if let Some(parent_data) = self.elements.get_mut(old_parent_id) {
                parent_data.children.retain(|&child| child != id);
                if parent_data.active_child == Some(id) {
                    parent_data.active_child = None;
                }
            }
        }

        if let Some(data) = self.elements.get_mut(id) {
            data.parent = new_parent;
        }

        if let Some(parent_id) = new_parent {
            if let Some(parent_data) = self.elements.get_mut(parent_id) {
                parent_data.children.push(id);
            }
        }

        Ok(())
    }

    /// Check if `potential_ancestor` is an ancestor of `id` (or `id` itself).
    fn is_ancestor_of(&self, potential_ancestor: ElementId, id: ElementId) -> ElementResult<bool> {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == potential_ancestor {
                return Ok(true);
            }
            current = self.elements.get(current_id).and_then(|d| d.parent);
        }
        Ok(false)
    }

    /// Get the parent of an element.
    pub fn parent(&self, id: ElementId) -> ElementResult<Option<ElementId>> {
        self.elements
            .get(id)
            .map(|d| d.parent)
            .ok_or(ElementError::InvalidElementId)
    }

    /// Get the children of an element.
    pub fn children(&self, id: ElementId) -> ElementResult<&[ElementId]> {
        self.elements
            .get(id)
            .map(|d| d.children.as_slice())
            .ok_or(ElementError::InvalidElementId)
    }

    /// Get all ancestors of an element from immediate parent to root.
    pub fn ancestors(&self, id: ElementId) -> ElementResult<Vec<ElementId>> {
        if !self.elements.contains_key(id) {
            return Err(ElementError::InvalidElementId);
        }

        let mut result = Vec::new();
        let mut current = self.elements.get(id).and_then(|d| d.parent);

        while let Some(current_id) = current {
            result.push(current_id);
            current = self.elements.get(current_id).and_then(|d| d.parent);
        }

        Ok(result)
    }

    /// Get the element's name.
    pub fn name(&self, id: ElementId) -> ElementResult<&str> {
        self.elements
            .get(id)
            .map(|d| d.name.as_str())
            .ok_or(ElementError::InvalidElementId)
    }

    /// Set the element's name.
    pub fn set_name(&mut self, id: ElementId, name: String) -> ElementResult<()> {
        self.elements
            .get_mut(id)
            .map(|d| d.name = name)
            .ok_or(ElementError::InvalidElementId)
    }

    /// Check if the element itself is visible.
    pub fn is_visible(&self, id: ElementId) -> ElementResult<bool> {
        self.elements
            .get(id)
            .map(|d| d.visible)
            .ok_or(ElementError::InvalidElementId)
    }

    /// Set the visible state of an element.
    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> ElementResult<()> {
        self.elements
            .get_mut(id)
            .map(|d| d.visible = visible)
            .ok_or(ElementError::InvalidElementId)
    }

    /// Check if the element itself is enabled.
    pub fn is_enabled(&self, id: ElementId) -> ElementResult<bool> {
        self.elements
            .get(id)
            .map(|d| d.enabled)
            .ok_or(ElementError::InvalidElementId)
    }

    /// Set the enabled state of an element.
    pub fn set_enabled(&mut self, id: ElementId, enabled: bool) -> ElementResult<()> {
        self.elements
            .get_mut(id)
            .map(|d| d.enabled = enabled)
            .ok_or(ElementError::InvalidElementId)
    }

    /// Get the active child of an element, if any.
    pub fn active_child(&self, id: ElementId) -> ElementResult<Option<ElementId>> {
        self.elements
            .get(id)
            .map(|d| d.active_child)
            .ok_or(ElementError::InvalidElementId)
    }

    /// Set which child of `id` currently holds focus.
    ///
    /// The active child must be a direct child of `id`, or `id` itself (which
    /// marks `id` as the innermost element of the active chain). Passing
    /// `None` clears the entry.
    pub fn set_active_child(
        &mut self,
        id: ElementId,
        active: Option<ElementId>,
    ) -> ElementResult<()> {
        if let Some(active_id) = active {
            if active_id != id {
                let data = self.elements.get(id).ok_or(ElementError::InvalidElementId)?;
                if !data.children.contains(&active_id) {
                    return Err(ElementError::NotAChild);
                }
            }
        }
        self.elements
            .get_mut(id)
            .map(|d| d.active_child = active)
            .ok_or(ElementError::InvalidElementId)
    }

    /// Resolve the innermost active element under `root`.
    ///
    /// Descends the active-child chain from the top-level container down to
    /// the innermost leaf. The chain terminates at an element with no active
    /// child of its own, or at an element whose active child points to
    /// itself. Returns `None` when `root` has no active child at all.
    pub fn active_leaf(&self, root: ElementId) -> ElementResult<Option<ElementId>> {
        let mut current = self.active_child(root)?;
        while let Some(id) = current {
            match self.active_child(id)? {
                None => break,
                Some(next) if next == id => break,
                Some(next) => current = Some(next),
            }
        }
        Ok(current)
    }

    /// Get the number of registered elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe wrapper around [`ElementRegistry`].
///
/// Provides concurrent read access with exclusive write access via `RwLock`,
/// and carries the tree's destruction notification: every consumer that keys
/// state by [`ElementId`] (binding registries, command attachments) connects
/// to [`destroyed`](Self::destroyed) and purges its entry when the signal
/// fires. Destruction callbacks run after the registry lock is released, so
/// listeners may call back into the registry freely.
pub struct SharedElementRegistry {
    inner: RwLock<ElementRegistry>,
    destroyed: crate::Signal<ElementId>,
}

impl SharedElementRegistry {
    /// Create a new shared element registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ElementRegistry::new()),
            destroyed: crate::Signal::new(),
        }
    }

    /// The destruction notification signal.
    ///
    /// Emitted exactly once per destroyed element, descendants before
    /// ancestors.
    pub fn destroyed(&self) -> &crate::Signal<ElementId> {
        &self.destroyed
    }

    /// Register a new root element.
    pub fn register(&self) -> ElementId {
        self.inner.write().register()
    }

    /// Register a new element as a child of `parent`.
    pub fn register_child(&self, parent: ElementId) -> ElementResult<ElementId> {
        self.inner.write().register_child(parent)
    }

    /// Destroy an element and its descendants, then notify listeners.
    pub fn destroy(&self, id: ElementId) -> ElementResult<()> {
        let destroyed = self.inner.write().destroy(id)?;
        for element in destroyed {
            self.destroyed.emit(element);
        }
        Ok(())
    }

    /// Check if an element exists.
    pub fn contains(&self, id: ElementId) -> bool {
        self.inner.read().contains(id)
    }

    /// Set the parent of an element.
    pub fn set_parent(&self, id: ElementId, parent: Option<ElementId>) -> ElementResult<()> {
        self.inner.write().set_parent(id, parent)
    }

    /// Get the parent of an element.
    pub fn parent(&self, id: ElementId) -> ElementResult<Option<ElementId>> {
        self.inner.read().parent(id)
    }

    /// Get the children of an element (returns an owned Vec for thread safety).
    pub fn children(&self, id: ElementId) -> ElementResult<Vec<ElementId>> {
        self.inner.read().children(id).map(|c| c.to_vec())
    }

    /// Get all ancestors of an element from immediate parent to root.
    pub fn ancestors(&self, id: ElementId) -> ElementResult<Vec<ElementId>> {
        self.inner.read().ancestors(id)
    }

    /// Get the element's name.
    pub fn name(&self, id: ElementId) -> ElementResult<String> {
        self.inner.read().name(id).map(|s| s.to_string())
    }

    /// Set the element's name.
    pub fn set_name(&self, id: ElementId, name: impl Into<String>) -> ElementResult<()> {
        self.inner.write().set_name(id, name.into())
    }

    /// Check if the element itself is visible.
    pub fn is_visible(&self, id: ElementId) -> ElementResult<bool> {
        self.inner.read().is_visible(id)
    }

    /// Set the visible state of an element.
    pub fn set_visible(&self, id: ElementId, visible: bool) -> ElementResult<()> {
        self.inner.write().set_visible(id, visible)
    }

    /// Check if the element itself is enabled.
    pub fn is_enabled(&self, id: ElementId) -> ElementResult<bool> {
        self.inner.read().is_enabled(id)
    }

    /// Set the enabled state of an element.
    pub fn set_enabled(&self, id: ElementId, enabled: bool) -> ElementResult<()> {
        self.inner.write().set_enabled(id, enabled)
    }

    /// Get the active child of an element.
    pub fn active_child(&self, id: ElementId) -> ElementResult<Option<ElementId>> {
        self.inner.read().active_child(id)
    }

    /// Set which child of `id` currently holds focus.
    pub fn set_active_child(&self, id: ElementId, active: Option<ElementId>) -> ElementResult<()> {
        self.inner.write().set_active_child(id, active)
    }

    /// Resolve the innermost active element under `root`.
    pub fn active_leaf(&self, root: ElementId) -> ElementResult<Option<ElementId>> {
        self.inner.read().active_leaf(root)
    }

    /// Get the number of registered elements.
    pub fn element_count(&self) -> usize {
        self.inner.read().element_count()
    }

    /// Access the registry with a read lock for complex operations.
    pub fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ElementRegistry) -> R,
    {
        f(&self.inner.read())
    }

    /// Access the registry with a write lock for complex operations.
    pub fn with_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ElementRegistry) -> R,
    {
        f(&mut self.inner.write())
    }
}

impl Default for SharedElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(SharedElementRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn register_and_contains() {
        let registry = SharedElementRegistry::new();
        let id = registry.register();
        assert!(registry.contains(id));
        assert_eq!(registry.element_count(), 1);
    }

    #[test]
    fn parent_child_links() {
        let registry = SharedElementRegistry::new();
        let parent = registry.register();
        let child = registry.register_child(parent).unwrap();

        assert_eq!(registry.parent(child).unwrap(), Some(parent));
        assert!(registry.children(parent).unwrap().contains(&child));
    }

    #[test]
    fn ancestors_inner_to_root() {
        let registry = SharedElementRegistry::new();
        let root = registry.register();
        let mid = registry.register_child(root).unwrap();
        let leaf = registry.register_child(mid).unwrap();

        assert_eq!(registry.ancestors(leaf).unwrap(), vec![mid, root]);
    }

    #[test]
    fn circular_parentage_rejected() {
        let registry = SharedElementRegistry::new();
        let a = registry.register();
        let b = registry.register_child(a).unwrap();

        let result = registry.set_parent(a, Some(b));
        assert_eq!(result, Err(ElementError::CircularParentage));
    }

    #[test]
    fn cascade_destroy_notifies_children_first() {
        let registry = SharedElementRegistry::new();
        let root = registry.register();
        let mid = registry.register_child(root).unwrap();
        let leaf = registry.register_child(mid).unwrap();

        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let order_clone = order.clone();
        registry.destroyed().connect(move |&id| {
            order_clone.lock().push(id);
        });

        registry.destroy(root).unwrap();

        assert!(!registry.contains(root));
        assert!(!registry.contains(mid));
        assert!(!registry.contains(leaf));
        assert_eq!(*order.lock(), vec![leaf, mid, root]);
    }

    #[test]
    fn destroyed_fires_once_per_element() {
        let registry = SharedElementRegistry::new();
        let id = registry.register();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        registry.destroyed().connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.destroy(id).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.destroy(id), Err(ElementError::InvalidElementId));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_id_fails_after_destroy() {
        let registry = SharedElementRegistry::new();
        let id = registry.register();
        registry.destroy(id).unwrap();

        assert_eq!(registry.is_enabled(id), Err(ElementError::InvalidElementId));
        assert_eq!(registry.parent(id), Err(ElementError::InvalidElementId));
    }

    #[test]
    fn active_child_must_be_child() {
        let registry = SharedElementRegistry::new();
        let parent = registry.register();
        let child = registry.register_child(parent).unwrap();
        let stranger = registry.register();

        assert!(registry.set_active_child(parent, Some(child)).is_ok());
        assert_eq!(
            registry.set_active_child(parent, Some(stranger)),
            Err(ElementError::NotAChild)
        );
    }

    #[test]
    fn active_leaf_descends_chain() {
        let registry = SharedElementRegistry::new();
        let root = registry.register();
        let panel = registry.register_child(root).unwrap();
        let field = registry.register_child(panel).unwrap();

        assert_eq!(registry.active_leaf(root).unwrap(), None);

        registry.set_active_child(root, Some(panel)).unwrap();
        registry.set_active_child(panel, Some(field)).unwrap();
        assert_eq!(registry.active_leaf(root).unwrap(), Some(field));
    }

    #[test]
    fn active_leaf_stops_at_self_pointing_entry() {
        let registry = SharedElementRegistry::new();
        let root = registry.register();
        let panel = registry.register_child(root).unwrap();

        registry.set_active_child(root, Some(panel)).unwrap();
        registry.set_active_child(panel, Some(panel)).unwrap();
        assert_eq!(registry.active_leaf(root).unwrap(), Some(panel));
    }

    #[test]
    fn destroy_clears_parent_active_child() {
        let registry = SharedElementRegistry::new();
        let root = registry.register();
        let panel = registry.register_child(root).unwrap();

        registry.set_active_child(root, Some(panel)).unwrap();
        registry.destroy(panel).unwrap();
        assert_eq!(registry.active_child(root).unwrap(), None);
    }

    #[test]
    fn visible_and_enabled_default_true() {
        let registry = SharedElementRegistry::new();
        let id = registry.register();
        assert!(registry.is_visible(id).unwrap());
        assert!(registry.is_enabled(id).unwrap());

        registry.set_visible(id, false).unwrap();
        registry.set_enabled(id, false).unwrap();
        assert!(!registry.is_visible(id).unwrap());
        assert!(!registry.is_enabled(id).unwrap());
    }

    #[test]
    fn reparenting_moves_child() {
        let registry = SharedElementRegistry::new();
        let a = registry.register();
        let b = registry.register();
        let child = registry.register_child(a).unwrap();

        registry.set_parent(child, Some(b)).unwrap();
        assert!(!registry.children(a).unwrap().contains(&child));
        assert!(registry.children(b).unwrap().contains(&child));
        assert_eq!(registry.parent(child).unwrap(), Some(b));
    }
}
