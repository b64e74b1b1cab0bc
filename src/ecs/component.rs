//! Sparse-set component storage
//!
//! Every component type lives in its own [`ComponentPool`], three parallel
//! arrays kept in lockstep:
//!
//! - `sparse[entity]` holds the entity's slot in the packed arrays, or
//!   [`EMPTY`] when it has no component of this type
//! - `dense[slot]` holds the component value
//! - `owners[slot]` holds the entity owning `dense[slot]`
//!
//! For every occupied slot `i`, `sparse[owners[i]] == i`. Removal swaps the
//! last slot into the hole, so packed order changes on every remove.

use std::any::{self, Any};

use super::error::InvariantError;
use super::EntityId;

/// Sparse entry for "no component".
const EMPTY: u32 = u32::MAX;

/// Marker for storable component types. Any `Send + Sync + 'static` value qualifies.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

/// Type-erased view of a [`ComponentPool`], enough to sweep an entity out of
/// every pool without knowing the component types.
pub trait ErasedPool: Send + Sync {
    /// Drop `entity`'s component if it has one. Returns whether anything was removed.
    fn remove(&mut self, entity: EntityId) -> bool;
    fn has(&self, entity: EntityId) -> bool;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn component_name(&self) -> &'static str;
    fn check_invariants(&self) -> Result<(), InvariantError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Sparse-set storage for one component type.
pub struct ComponentPool<T: Component> {
    sparse: Vec<u32>,
    dense: Vec<T>,
    owners: Vec<EntityId>,
}

impl<T: Component> ComponentPool<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            owners: Vec::new(),
        }
    }

    /// Pre-size the packed arrays for `capacity` components.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::with_capacity(capacity),
            owners: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    fn slot(&self, entity: EntityId) -> Option<usize> {
        match self.sparse.get(entity.index()) {
            Some(&slot) if slot != EMPTY => Some(slot as usize),
            _ => None,
        }
    }

    /// Attach `value` to `entity`, overwriting any component it already has.
    pub fn add(&mut self, entity: EntityId, value: T) {
        debug_assert!(!entity.is_null(), "adding a component to the null entity");
        let index = entity.index();
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, EMPTY);
        }

        if let Some(slot) = self.slot(entity) {
            self.dense[slot] = value;
            return;
        }

        let slot = self.dense.len();
        debug_assert!(slot < EMPTY as usize, "component pool overflow");
        self.sparse[index] = slot as u32;
        self.dense.push(value);
        self.owners.push(entity);
    }

    /// Detach and return `entity`'s component.
    pub fn take(&mut self, entity: EntityId) -> Option<T> {
        let slot = self.slot(entity)?;

        let value = self.dense.swap_remove(slot);
        self.owners.swap_remove(slot);
        if let Some(&moved) = self.owners.get(slot) {
            self.sparse[moved.index()] = slot as u32;
        }
        self.sparse[entity.index()] = EMPTY;

        Some(value)
    }

    /// Detach `entity`'s component. No-op when it has none.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        self.take(entity).is_some()
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.slot(entity).map(|slot| &self.dense[slot])
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        let slot = self.slot(entity)?;
        Some(&mut self.dense[slot])
    }

    pub fn has(&self, entity: EntityId) -> bool {
        self.slot(entity).is_some()
    }

    /// Visit every `(owner, component)` pair in packed order.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(EntityId, &T),
    {
        for (entity, value) in self.owners.iter().zip(self.dense.iter()) {
            visitor(*entity, value);
        }
    }

    pub fn for_each_mut<F>(&mut self, mut visitor: F)
    where
        F: FnMut(EntityId, &mut T),
    {
        for (entity, value) in self.owners.iter().zip(self.dense.iter_mut()) {
            visitor(*entity, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }

    /// Owners in packed order.
    pub fn entities(&self) -> &[EntityId] {
        &self.owners
    }

    /// Components in packed order.
    pub fn components(&self) -> &[T] {
        &self.dense
    }

    pub fn size(&self) -> usize {
        self.dense.len()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.owners.clear();
    }

    /// Verify the sparse/dense/owner links. O(sparse length).
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let component = any::type_name::<T>();

        if self.dense.len() != self.owners.len() {
            return Err(InvariantError::LengthMismatch {
                component,
                dense: self.dense.len(),
                owners: self.owners.len(),
            });
        }

        for (slot, &entity) in self.owners.iter().enumerate() {
            let found = self.slot(entity);
            if found != Some(slot) {
                return Err(InvariantError::BrokenBackReference {
                    component,
                    slot,
                    entity,
                    found,
                });
            }
        }

        for (index, &slot) in self.sparse.iter().enumerate() {
            if slot == EMPTY {
                continue;
            }
            let entity = EntityId::from_raw(index as u32);
            let slot = slot as usize;
            if self.owners.get(slot) != Some(&entity) {
                return Err(InvariantError::DanglingSparse {
                    component,
                    entity,
                    slot,
                });
            }
        }

        Ok(())
    }
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn remove(&mut self, entity: EntityId) -> bool {
        ComponentPool::remove(self, entity)
    }

    fn has(&self, entity: EntityId) -> bool {
        ComponentPool::has(self, entity)
    }

    fn clear(&mut self) {
        ComponentPool::clear(self);
    }

    fn len(&self) -> usize {
        ComponentPool::len(self)
    }

    fn component_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        ComponentPool::check_invariants(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
