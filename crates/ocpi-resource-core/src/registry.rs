//! Containment registries for parent-owned children.
//!
//! A [`Registry`] owns the children of one parent (a location's charging
//! stations, a station's EVSEs), keyed by the child's id. The map is
//! copy-on-write: writers swap in a new snapshot under a write lock, so a
//! reader holding a snapshot never observes a half-applied mutation.
//!
//! Children record their parent in a write-once slot at insertion time.

use crate::error::ConstructionError;
use crate::identity::PartyId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Back-reference from a child to its owning parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentRef {
    /// Parent resource kind (e.g. `"Location"`)
    pub kind: &'static str,
    /// Parent's issuing party
    pub party_id: PartyId,
    /// Parent's id
    pub id: String,
}

impl ParentRef {
    /// Create a back-reference.
    #[must_use]
    pub fn new(kind: &'static str, party_id: PartyId, id: impl Into<String>) -> Self {
        Self {
            kind,
            party_id,
            id: id.into(),
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.kind, self.party_id, self.id)
    }
}

/// Write-once holder of a child's [`ParentRef`].
///
/// A clone starts detached: copying a child out of one graph (e.g. into a
/// builder) must not carry the old owner into the next one.
#[derive(Default)]
pub struct ParentSlot(OnceLock<ParentRef>);

impl ParentSlot {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded parent, if any.
    #[must_use]
    pub fn get(&self) -> Option<&ParentRef> {
        self.0.get()
    }

    /// Record `parent` unless one is already set.
    pub fn set(&self, parent: ParentRef) -> bool {
        self.0.set(parent).is_ok()
    }
}

impl Clone for ParentSlot {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParentSlot").field(&self.get()).finish()
    }
}

/// A value that can be owned by a registry.
pub trait Child {
    /// Registry key, unique within one parent.
    fn key(&self) -> &str;

    /// Write-once parent slot.
    fn parent_slot(&self) -> &ParentSlot;

    /// Owning parent, once attached.
    fn parent(&self) -> Option<&ParentRef> {
        self.parent_slot().get()
    }

    /// Record the owning parent.
    ///
    /// Returns `false` if a parent was already recorded; the first
    /// assignment is kept.
    fn attach(&self, parent: ParentRef) -> bool {
        self.parent_slot().set(parent)
    }
}

type Snapshot<V> = Arc<BTreeMap<String, Arc<V>>>;

/// Keyed, thread-safe collection of children owned by one parent.
pub struct Registry<V> {
    parent: ParentRef,
    field: &'static str,
    entries: RwLock<Snapshot<V>>,
}

impl<V: Child> Registry<V> {
    /// Create an empty registry for `parent`. `field` is the wire name of
    /// the collection, used in errors and logs.
    #[must_use]
    pub fn new(parent: ParentRef, field: &'static str) -> Self {
        Self {
            parent,
            field,
            entries: RwLock::new(Arc::new(BTreeMap::new())),
        }
    }

    /// Create a registry holding `children`.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::DuplicateChild`] if two children share a
    /// key.
    pub fn with_children(
        parent: ParentRef,
        field: &'static str,
        children: impl IntoIterator<Item = V>,
    ) -> Result<Self, ConstructionError> {
        let registry = Self::new(parent, field);
        for child in children {
            let key = child.key().to_string();
            if !registry.try_add(child) {
                return Err(ConstructionError::DuplicateChild {
                    field: field.to_string(),
                    key,
                });
            }
        }
        Ok(registry)
    }

    /// The owning parent.
    #[must_use]
    pub fn parent(&self) -> &ParentRef {
        &self.parent
    }

    /// Insert `child` unless its key is taken.
    ///
    /// Returns `false` without touching the existing child on collision.
    pub fn try_add(&self, child: V) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(child.key()) {
            tracing::debug!(
                parent = %self.parent,
                field = self.field,
                key = child.key(),
                "Rejected duplicate child"
            );
            return false;
        }
        child.attach(self.parent.clone());
        let key = child.key().to_string();
        Arc::make_mut(&mut *entries).insert(key, Arc::new(child));
        true
    }

    /// Look up a child by key.
    #[must_use]
    pub fn try_get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.read().get(key).cloned()
    }

    /// `true` if a child with `key` exists.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Remove and return the child with `key`.
    pub fn remove(&self, key: &str) -> Option<Arc<V>> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            return None;
        }
        let removed = Arc::make_mut(&mut *entries).remove(key);
        tracing::debug!(parent = %self.parent, field = self.field, key, "Removed child");
        removed
    }

    /// Replace the child with the same key (or insert it) in one critical
    /// section and return the previous child.
    pub fn update_child(&self, child: V) -> Option<Arc<V>> {
        let mut entries = self.entries.write();
        child.attach(self.parent.clone());
        let key = child.key().to_string();
        let previous = Arc::make_mut(&mut *entries).insert(key, Arc::new(child));
        tracing::debug!(
            parent = %self.parent,
            field = self.field,
            replaced = previous.is_some(),
            "Updated child"
        );
        previous
    }

    /// Consistent view of all children, ordered by key.
    #[must_use]
    pub fn snapshot(&self) -> Arc<BTreeMap<String, Arc<V>>> {
        Arc::clone(&*self.entries.read())
    }

    /// All children, ordered by key.
    #[must_use]
    pub fn values(&self) -> Vec<Arc<V>> {
        self.snapshot().values().cloned().collect()
    }

    /// All keys, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// `true` if there are no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V> Clone for Registry<V> {
    /// Clones start from the same snapshot and diverge on the next write.
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            field: self.field,
            entries: RwLock::new(Arc::clone(&*self.entries.read())),
        }
    }
}

impl<V> fmt::Debug for Registry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("parent", &self.parent)
            .field("field", &self.field)
            .field("keys", &self.entries.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
