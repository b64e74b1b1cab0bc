pub mod components;
pub mod config;
pub mod ecs;
pub mod rng;
pub mod soak;

pub use config::WorkloadConfig;
pub use ecs::{CommandQueue, ComponentPool, EntityId, EntityRegistry, StorageRegistry, World};
pub use soak::{run_workload, Soak, SoakReport};
