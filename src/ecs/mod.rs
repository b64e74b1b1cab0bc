//! Entity Component System (ECS) storage core
//!
//! Sparse-set pools, one per component type, behind a type-keyed registry,
//! with recycled entity ids.

pub mod commands;
pub mod component;
pub mod entity;
pub mod error;
pub mod storage;
pub mod world;

pub use commands::CommandQueue;
pub use component::{Component, ComponentPool, ErasedPool};
pub use entity::{EntityId, EntityRegistry};
pub use error::InvariantError;
pub use storage::StorageRegistry;
pub use world::World;
