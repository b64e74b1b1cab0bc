//! Type-keyed registry of component pools

use std::any::{self, TypeId};
use std::collections::HashMap;

use log::trace;

use super::component::{Component, ComponentPool, ErasedPool};
use super::error::InvariantError;
use super::EntityId;

/// Owns one [`ComponentPool`] per component type.
///
/// Pools are created lazily by [`add_component`](Self::add_component) and
/// [`pool_for`](Self::pool_for) and live as long as the registry. Lookups
/// (`get`, `has`, `remove`, `for_each`) never create a pool.
#[derive(Default)]
pub struct StorageRegistry {
    pools: HashMap<TypeId, Box<dyn ErasedPool>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
        }
    }

    /// Get the pool for `T`, creating an empty one on first use.
    pub fn pool_for<T: Component>(&mut self) -> &mut ComponentPool<T> {
        self.pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                trace!("creating pool for {}", any::type_name::<T>());
                Box::new(ComponentPool::<T>::new())
            })
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
            .expect("pool registered under a foreign TypeId")
    }

    /// Get the pool for `T` if one exists.
    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        self.pools
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
    }

    pub fn pool_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        self.pools
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
    }

    pub fn contains_pool<T: Component>(&self) -> bool {
        self.pools.contains_key(&TypeId::of::<T>())
    }

    /// Number of component types registered so far.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Attach `component` to `entity`, replacing any existing `T`.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) {
        self.pool_for::<T>().add(entity, component);
    }

    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.pool::<T>()?.get(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.pool_mut::<T>()?.get_mut(entity)
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.pool::<T>().map_or(false, |pool| pool.has(entity))
    }

    /// Detach `entity`'s `T`. Returns whether it had one.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> bool {
        self.pool_mut::<T>().map_or(false, |pool| pool.remove(entity))
    }

    /// Visit every `T` in packed order. Silent no-op when `T` was never added.
    pub fn for_each<T, F>(&self, visitor: F)
    where
        T: Component,
        F: FnMut(EntityId, &T),
    {
        if let Some(pool) = self.pool::<T>() {
            pool.for_each(visitor);
        }
    }

    pub fn for_each_mut<T, F>(&mut self, visitor: F)
    where
        T: Component,
        F: FnMut(EntityId, &mut T),
    {
        if let Some(pool) = self.pool_mut::<T>() {
            pool.for_each_mut(visitor);
        }
    }

    /// Sweep `entity` out of every registered pool. Returns how many pools held it.
    pub fn remove_entity_from_all(&mut self, entity: EntityId) -> usize {
        self.pools
            .values_mut()
            .map(|pool| pool.remove(entity))
            .filter(|removed| *removed)
            .count()
    }

    /// `(component name, size)` for every pool, sorted by name.
    pub fn pool_sizes(&self) -> Vec<(&'static str, usize)> {
        let mut sizes: Vec<_> = self
            .pools
            .values()
            .map(|pool| (pool.component_name(), pool.len()))
            .collect();
        sizes.sort_unstable();
        sizes
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.pools
            .values()
            .try_for_each(|pool| pool.check_invariants())
    }

    /// Empty every pool, keeping the pools themselves registered.
    pub fn clear(&mut self) {
        for pool in self.pools.values_mut() {
            pool.clear();
        }
    }
}
