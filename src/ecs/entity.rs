//! Entity management

use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use super::storage::StorageRegistry;

/// Entity identifier - an opaque index into every pool's sparse array.
///
/// `0` is reserved and never handed out by [`EntityRegistry::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// The "no entity" sentinel.
    pub const NULL: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Slot in a sparse array.
    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocates and recycles entity ids.
///
/// Fresh ids come from a monotonic counter starting at 1; destroyed ids go on
/// a LIFO free list and are handed out again before the counter advances.
///
/// Destroying an id twice without recreating it in between is a caller error.
/// Debug builds assert on it; release builds push the id onto the free list a
/// second time, after which two `create` calls can return the same id. Ids
/// never handed out (including `NULL`) are ignored by `destroy` in release.
pub struct EntityRegistry {
    next_id: u32,
    free_list: Vec<EntityId>,
    alive: Vec<bool>,
    alive_count: usize,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            free_list: Vec::new(),
            alive: vec![false],
            alive_count: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut alive = Vec::with_capacity(capacity + 1);
        alive.push(false);
        Self {
            next_id: 0,
            free_list: Vec::new(),
            alive,
            alive_count: 0,
        }
    }

    /// Hand out an id, preferring the most recently destroyed one.
    ///
    /// # Panics
    ///
    /// Panics if every id up to `u32::MAX` is in use.
    pub fn create(&mut self) -> EntityId {
        let id = match self.free_list.pop() {
            Some(id) => id,
            None => {
                self.next_id = self
                    .next_id
                    .checked_add(1)
                    .expect("entity id space exhausted");
                self.alive.push(false);
                EntityId(self.next_id)
            }
        };
        self.alive[id.index()] = true;
        self.alive_count += 1;
        id
    }

    /// Remove `id` from every pool in `storage`, then recycle it.
    ///
    /// Costs one type-erased remove per registered component type, whether or
    /// not the entity ever held that type.
    pub fn destroy(&mut self, id: EntityId, storage: &mut StorageRegistry) {
        debug_assert!(
            self.is_alive(id),
            "destroying entity {id} which is not alive"
        );
        trace!("destroying entity {id} across {} pools", storage.pool_count());
        storage.remove_entity_from_all(id);
        self.release(id);
    }

    /// Return `id` to the free list without touching any storage.
    ///
    /// Ids this registry never handed out (including `NULL`) are ignored.
    pub(crate) fn release(&mut self, id: EntityId) {
        if id.is_null() || id.raw() > self.next_id {
            return;
        }
        if let Some(slot) = self.alive.get_mut(id.index()) {
            if *slot {
                *slot = false;
                self.alive_count -= 1;
            }
        }
        self.free_list.push(id);
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of ids handed out and not yet destroyed.
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Highest id ever handed out (`0` when none).
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_allocation() {
        let mut registry = EntityRegistry::new();

        let e1 = registry.create();
        assert_eq!(e1.raw(), 1);
        assert!(registry.is_alive(e1));

        let e2 = registry.create();
        assert_eq!(e2.raw(), 2);
        assert!(registry.is_alive(e2));

        assert_eq!(registry.alive_count(), 2);
        assert!(!registry.is_alive(EntityId::NULL));
    }

    #[test]
    fn test_entity_recycling_is_lifo() {
        let mut registry = EntityRegistry::new();
        let mut storage = StorageRegistry::new();

        let e1 = registry.create();
        let e2 = registry.create();
        let e3 = registry.create();

        registry.destroy(e1, &mut storage);
        registry.destroy(e3, &mut storage);
        assert!(!registry.is_alive(e1));
        assert!(registry.is_alive(e2));
        assert_eq!(registry.alive_count(), 1);
        assert_eq!(registry.free_count(), 2);

        assert_eq!(registry.create(), e3);
        assert_eq!(registry.create(), e1);
        assert_eq!(registry.create().raw(), 4);
        assert_eq!(registry.high_water_mark(), 4);
    }

    #[test]
    fn test_null_never_allocated() {
        let mut registry = EntityRegistry::with_capacity(16);
        let mut storage = StorageRegistry::new();
        for _ in 0..64 {
            let id = registry.create();
            assert!(!id.is_null());
            if id.raw() % 3 == 0 {
                registry.destroy(id, &mut storage);
            }
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not alive")]
    fn test_double_destroy_asserts_in_debug() {
        let mut registry = EntityRegistry::new();
        let mut storage = StorageRegistry::new();
        let e = registry.create();
        registry.destroy(e, &mut storage);
        registry.destroy(e, &mut storage);
    }

    #[test]
    fn test_release_ignores_ids_never_handed_out() {
        let mut registry = EntityRegistry::new();
        let e1 = registry.create();

        registry.release(EntityId::NULL);
        registry.release(EntityId::from_raw(50));
        assert_eq!(registry.free_count(), 0);
        assert_eq!(registry.alive_count(), 1);

        let e2 = registry.create();
        assert_eq!(e2.raw(), 2);
        assert!(registry.is_alive(e1));
        assert!(registry.is_alive(e2));
    }

    #[test]
    fn test_release_of_allocated_id_recycles_it() {
        let mut registry = EntityRegistry::new();
        let e1 = registry.create();
        let _e2 = registry.create();

        registry.release(e1);
        assert!(!registry.is_alive(e1));
        assert_eq!(registry.alive_count(), 1);
        assert_eq!(registry.create(), e1);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_destroy_of_unknown_id_is_noop_in_release() {
        let mut registry = EntityRegistry::new();
        let mut storage = StorageRegistry::new();
        registry.destroy(EntityId::NULL, &mut storage);
        registry.destroy(EntityId::from_raw(50), &mut storage);

        let id = registry.create();
        assert!(!id.is_null());
        assert_eq!(id.raw(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId::from_raw(7).to_string(), "#7");
    }
}
