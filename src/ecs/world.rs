//! World - entity registry plus component storage

use super::commands::CommandQueue;
use super::{Component, EntityId, EntityRegistry, StorageRegistry};

/// World holds all entities and components.
///
/// Each world is an independent instance; nothing is shared between worlds.
#[derive(Default)]
pub struct World {
    entities: EntityRegistry,
    storage: StorageRegistry,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: EntityRegistry::new(),
            storage: StorageRegistry::new(),
        }
    }

    /// Create a new entity
    pub fn create(&mut self) -> EntityId {
        self.entities.create()
    }

    /// Destroy an entity and remove all its components
    pub fn destroy(&mut self, entity: EntityId) {
        self.entities.destroy(entity, &mut self.storage);
    }

    /// Check if entity is alive
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    /// Get number of alive entities
    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Add a component to an entity
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) {
        debug_assert!(
            self.entities.is_alive(entity),
            "adding a component to entity {entity} which is not alive"
        );
        self.storage.add_component(entity, component);
    }

    /// Get a component from an entity
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.storage.get_component(entity)
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.storage.get_component_mut(entity)
    }

    /// Check if entity has a component
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.storage.has_component::<T>(entity)
    }

    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> bool {
        self.storage.remove_component::<T>(entity)
    }

    pub fn for_each<T, F>(&self, visitor: F)
    where
        T: Component,
        F: FnMut(EntityId, &T),
    {
        self.storage.for_each(visitor);
    }

    pub fn for_each_mut<T, F>(&mut self, visitor: F)
    where
        T: Component,
        F: FnMut(EntityId, &mut T),
    {
        self.storage.for_each_mut(visitor);
    }

    /// Apply and empty a queue of deferred changes.
    pub fn apply(&mut self, queue: &mut CommandQueue) {
        queue.drain_into(self);
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn storage(&self) -> &StorageRegistry {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut StorageRegistry {
        &mut self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentPool;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_send<T: Send>() {}

    #[test]
    fn test_storage_types_cross_threads() {
        assert_send_sync::<World>();
        assert_send_sync::<StorageRegistry>();
        assert_send_sync::<ComponentPool<Position>>();
        assert_send::<CommandQueue>();
    }

    #[test]
    fn test_destroyed_id_comes_back_without_components() {
        let mut world = World::new();
        let a = world.create();
        let b = world.create();
        assert!(!a.is_null());
        assert_eq!(world.entity_count(), 2);

        world.add_component(a, Position { x: 4.0, y: 5.0 });
        world.destroy(a);
        assert_eq!(world.entity_count(), 1);
        assert!(world.is_alive(b));

        let reused = world.create();
        assert_eq!(reused, a);
        assert!(world.is_alive(reused));
        assert!(!world.has_component::<Position>(reused));
        assert_eq!(world.get_component::<Position>(reused), None);
    }

    #[test]
    fn test_add_twice_keeps_one_slot() {
        let mut world = World::new();
        let entity = world.create();
        world.add_component(entity, Velocity { dx: 0.5, dy: 0.5 });
        world.add_component(entity, Velocity { dx: -1.0, dy: 2.0 });

        let pool = world.storage().pool::<Velocity>().unwrap();
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.entities(), &[entity]);
        assert_eq!(
            world.get_component::<Velocity>(entity),
            Some(&Velocity { dx: -1.0, dy: 2.0 })
        );

        world.destroy(entity);
        assert_eq!(world.storage().pool::<Velocity>().map(|pool| pool.size()), Some(0));
    }

    #[test]
    fn test_destroy_sweeps_every_pool() {
        let mut world = World::new();
        let a = world.create();
        let b = world.create();
        world.add_component(a, Position { x: 0.0, y: 0.0 });
        world.add_component(a, Velocity { dx: 1.0, dy: 1.0 });
        world.add_component(b, Velocity { dx: 2.0, dy: 2.0 });

        world.destroy(a);

        assert!(!world.has_component::<Position>(a));
        assert!(!world.has_component::<Velocity>(a));
        assert_eq!(
            world.get_component::<Velocity>(b),
            Some(&Velocity { dx: 2.0, dy: 2.0 })
        );
        assert_eq!(world.storage().pool_count(), 2);
    }

    #[test]
    fn test_for_each_mut_updates_in_place() {
        let mut world = World::new();
        let a = world.create();
        let b = world.create();
        world.add_component(a, Position { x: 0.0, y: 0.0 });
        world.add_component(b, Position { x: 1.0, y: 1.0 });
        world.add_component(a, Velocity { dx: 2.0, dy: 3.0 });

        let mut moves = Vec::new();
        world.for_each::<Velocity, _>(|entity, vel| moves.push((entity, vel.dx, vel.dy)));
        for (entity, dx, dy) in moves {
            if let Some(pos) = world.get_component_mut::<Position>(entity) {
                pos.x += dx;
                pos.y += dy;
            }
        }
        world.for_each_mut::<Position, _>(|_, pos| pos.x *= 10.0);

        assert_eq!(world.get_component::<Position>(a), Some(&Position { x: 20.0, y: 3.0 }));
        assert_eq!(world.get_component::<Position>(b), Some(&Position { x: 10.0, y: 1.0 }));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not alive")]
    fn test_add_to_dead_entity_asserts_in_debug() {
        let mut world = World::new();
        let entity = world.create();
        world.destroy(entity);
        world.add_component(entity, Position { x: 0.0, y: 0.0 });
    }
}
