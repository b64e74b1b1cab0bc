//! Deferred structural changes
//!
//! Iteration borrows a pool, so a visitor cannot add or remove components in
//! the same registry while it runs. Record the changes here instead and apply
//! them once the pass is over.

use super::{Component, EntityId, World};

type Command = Box<dyn FnOnce(&mut World) + Send>;

/// FIFO queue of pending world mutations.
#[derive(Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn destroy(&mut self, entity: EntityId) {
        self.commands
            .push(Box::new(move |world: &mut World| world.destroy(entity)));
    }

    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) {
        self.commands.push(Box::new(move |world: &mut World| {
            world.add_component(entity, component)
        }));
    }

    pub fn remove_component<T: Component>(&mut self, entity: EntityId) {
        self.commands.push(Box::new(move |world: &mut World| {
            world.remove_component::<T>(entity);
        }));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run every queued command against `world` in recording order.
    pub(crate) fn drain_into(&mut self, world: &mut World) {
        for command in self.commands.drain(..) {
            command(world);
        }
    }
}
