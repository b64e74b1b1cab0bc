//! Randomized soak workload
//!
//! Drives a [`World`] with a seeded mix of create/destroy/add/remove/get/iterate
//! calls, mirrors every call into a plain `HashMap` model, and fails on the
//! first disagreement or broken pool invariant.

use std::any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{Health, Label, Position, Velocity};
use crate::config::{ConfigError, WorkloadConfig};
use crate::ecs::{Component, EntityId, InvariantError, World};
use crate::rng::{RngExt, RngStreams, OPERATION_STREAM, VALUE_STREAM};

#[derive(Debug, Error)]
pub enum SoakError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("step {step}: {source}")]
    Invariant {
        step: u64,
        #[source]
        source: InvariantError,
    },
    #[error("step {step}: {detail}")]
    Mismatch { step: u64, detail: String },
}

/// How many times each operation ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    pub create: u64,
    pub destroy: u64,
    pub add: u64,
    pub remove: u64,
    pub get: u64,
    pub iterate: u64,
}

impl OperationCounts {
    pub fn total(&self) -> u64 {
        self.create + self.destroy + self.add + self.remove + self.get + self.iterate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoakReport {
    pub name: String,
    pub seed: u64,
    pub steps: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: f64,
    pub mean_step_ns: f64,
    pub counts: OperationCounts,
    pub live_entities: usize,
    pub peak_live_entities: usize,
    pub high_water_mark: u32,
    pub invariant_checks: u64,
    pub pool_sizes: BTreeMap<String, usize>,
}

impl fmt::Display for SoakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Workload '{}' (seed {}) passed {} steps in {:.1} ms ({:.0} ns/step)",
            self.name, self.seed, self.steps, self.elapsed_ms, self.mean_step_ns
        )?;
        writeln!(
            f,
            "  live entities: {} (peak {}, highest id {})",
            self.live_entities, self.peak_live_entities, self.high_water_mark
        )?;
        for (component, size) in &self.pool_sizes {
            writeln!(f, "  {component}: {size}")?;
        }
        write!(f, "  invariant checks: {}", self.invariant_checks)
    }
}

#[derive(Clone, Copy, Debug)]
enum Operation {
    Create,
    Destroy,
    Add,
    Remove,
    Get,
    Iterate,
}

/// Order matches `OperationMix::weights`.
const OPERATIONS: [Operation; 6] = [
    Operation::Create,
    Operation::Destroy,
    Operation::Add,
    Operation::Remove,
    Operation::Get,
    Operation::Iterate,
];

#[derive(Clone, Copy, Debug)]
enum Kind {
    Position,
    Velocity,
    Health,
    Label,
}

const KINDS: [Kind; 4] = [Kind::Position, Kind::Velocity, Kind::Health, Kind::Label];

#[derive(Default)]
struct Model {
    live: Vec<EntityId>,
    alive: HashSet<EntityId>,
    positions: HashMap<EntityId, Position>,
    velocities: HashMap<EntityId, Velocity>,
    healths: HashMap<EntityId, Health>,
    labels: HashMap<EntityId, Label>,
}

/// A component type the soak model tracks.
trait Tracked: Component + Clone + PartialEq + fmt::Debug {
    fn column(model: &Model) -> &HashMap<EntityId, Self>;
    fn column_mut(model: &mut Model) -> &mut HashMap<EntityId, Self>;
    fn generate(rng: &mut ChaCha8Rng) -> Self;
}

impl Tracked for Position {
    fn column(model: &Model) -> &HashMap<EntityId, Self> {
        &model.positions
    }

    fn column_mut(model: &mut Model) -> &mut HashMap<EntityId, Self> {
        &mut model.positions
    }

    fn generate(rng: &mut ChaCha8Rng) -> Self {
        Position::new(rng.random_f32(-100.0, 100.0), rng.random_f32(-100.0, 100.0))
    }
}

impl Tracked for Velocity {
    fn column(model: &Model) -> &HashMap<EntityId, Self> {
        &model.velocities
    }

    fn column_mut(model: &mut Model) -> &mut HashMap<EntityId, Self> {
        &mut model.velocities
    }

    fn generate(rng: &mut ChaCha8Rng) -> Self {
        Velocity::new(rng.random_f32(-5.0, 5.0), rng.random_f32(-5.0, 5.0))
    }
}

impl Tracked for Health {
    fn column(model: &Model) -> &HashMap<EntityId, Self> {
        &model.healths
    }

    fn column_mut(model: &mut Model) -> &mut HashMap<EntityId, Self> {
        &mut model.healths
    }

    fn generate(rng: &mut ChaCha8Rng) -> Self {
        let max = rng.gen_range(1..=500);
        Health {
            current: rng.gen_range(0..=max),
            max,
        }
    }
}

impl Tracked for Label {
    fn column(model: &Model) -> &HashMap<EntityId, Self> {
        &model.labels
    }

    fn column_mut(model: &mut Model) -> &mut HashMap<EntityId, Self> {
        &mut model.labels
    }

    fn generate(rng: &mut ChaCha8Rng) -> Self {
        Label(format!("unit-{}", rng.gen::<u16>()))
    }
}

fn mismatch(step: u64, detail: impl Into<String>) -> SoakError {
    let detail = detail.into();
    warn!("soak mismatch at step {step}: {detail}");
    SoakError::Mismatch { step, detail }
}

/// A seeded workload bound to its own world.
pub struct Soak {
    config: WorkloadConfig,
    world: World,
    model: Model,
    operations: ChaCha8Rng,
    values: ChaCha8Rng,
    picker: WeightedIndex<u32>,
    counts: OperationCounts,
    peak_live: usize,
    invariant_checks: u64,
}

impl Soak {
    pub fn new(config: WorkloadConfig) -> Result<Self, SoakError> {
        config.validate()?;
        let streams = RngStreams::new(config.seed);
        let picker = WeightedIndex::new(config.ops.weights())
            .map_err(|err| ConfigError::Validation(err.to_string()))?;

        Ok(Self {
            operations: streams.stream(OPERATION_STREAM),
            values: streams.stream(VALUE_STREAM),
            config,
            world: World::new(),
            model: Model::default(),
            picker,
            counts: OperationCounts::default(),
            peak_live: 0,
            invariant_checks: 0,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn counts(&self) -> &OperationCounts {
        &self.counts
    }

    /// Run every step, checking the world against the model as it goes.
    pub fn run(&mut self) -> Result<SoakReport, SoakError> {
        info!(
            "running workload '{}' ({} steps, seed {})",
            self.config.name, self.config.steps, self.config.seed
        );
        let started_at = Utc::now();
        let start = Instant::now();

        for _ in 0..self.config.initial_entities {
            self.create(0)?;
        }
        self.counts.create = 0;

        let progress_every = (self.config.steps / 10).max(1);
        for step in 1..=self.config.steps {
            self.step(step)?;

            if self.config.check_every > 0 && step % self.config.check_every == 0 {
                self.verify_all(step)?;
            }
            if step % progress_every == 0 {
                debug!(
                    "step {step}/{}: {} live entities",
                    self.config.steps,
                    self.model.live.len()
                );
            }
        }
        self.verify_all(self.config.steps)?;

        let elapsed = start.elapsed();
        let report = SoakReport {
            name: self.config.name.clone(),
            seed: self.config.seed,
            steps: self.config.steps,
            started_at,
            elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
            mean_step_ns: elapsed.as_nanos() as f64 / self.config.steps as f64,
            counts: self.counts.clone(),
            live_entities: self.world.entity_count(),
            peak_live_entities: self.peak_live,
            high_water_mark: self.world.entities().high_water_mark(),
            invariant_checks: self.invariant_checks,
            pool_sizes: self
                .world
                .storage()
                .pool_sizes()
                .into_iter()
                .map(|(name, size)| (name.to_string(), size))
                .collect(),
        };
        info!(
            "workload '{}' finished: {} live entities, {:.1} ms",
            report.name, report.live_entities, report.elapsed_ms
        );
        Ok(report)
    }

    fn step(&mut self, step: u64) -> Result<(), SoakError> {
        let operation = OPERATIONS[self.picker.sample(&mut self.operations)];
        let kind = KINDS[self.values.gen_range(0..KINDS.len())];

        match operation {
            Operation::Create => self.create(step),
            Operation::Iterate => {
                self.counts.iterate += 1;
                self.dispatch(operation, kind, step, EntityId::NULL)
            }
            Operation::Destroy => match self.pick_live() {
                Some(index) => self.destroy(step, index),
                None => self.create(step),
            },
            Operation::Add | Operation::Remove | Operation::Get => {
                let Some(index) = self.pick_live() else {
                    return self.create(step);
                };
                match operation {
                    Operation::Add => self.counts.add += 1,
                    Operation::Remove => self.counts.remove += 1,
                    _ => self.counts.get += 1,
                }
                let entity = self.model.live[index];
                self.dispatch(operation, kind, step, entity)
            }
        }
    }

    fn pick_live(&mut self) -> Option<usize> {
        if self.model.live.is_empty() {
            return None;
        }
        Some(self.values.gen_range(0..self.model.live.len()))
    }

    fn dispatch(
        &mut self,
        operation: Operation,
        kind: Kind,
        step: u64,
        entity: EntityId,
    ) -> Result<(), SoakError> {
        match kind {
            Kind::Position => self.typed::<Position>(operation, step, entity),
            Kind::Velocity => self.typed::<Velocity>(operation, step, entity),
            Kind::Health => self.typed::<Health>(operation, step, entity),
            Kind::Label => self.typed::<Label>(operation, step, entity),
        }
    }

    fn typed<T: Tracked>(
        &mut self,
        operation: Operation,
        step: u64,
        entity: EntityId,
    ) -> Result<(), SoakError> {
        match operation {
            Operation::Add => self.add::<T>(step, entity),
            Operation::Remove => self.remove::<T>(step, entity),
            Operation::Get => self.expect_value::<T>(step, entity),
            Operation::Iterate => self.expect_iteration::<T>(step),
            Operation::Create | Operation::Destroy => Ok(()),
        }
    }

    fn create(&mut self, step: u64) -> Result<(), SoakError> {
        self.counts.create += 1;
        let entity = self.world.create();

        if entity.is_null() {
            return Err(mismatch(step, "create returned the null id"));
        }
        if !self.model.alive.insert(entity) {
            return Err(mismatch(step, format!("create returned live id {entity}")));
        }
        self.model.live.push(entity);
        self.peak_live = self.peak_live.max(self.model.live.len());

        let leftovers = self.world.has_component::<Position>(entity)
            || self.world.has_component::<Velocity>(entity)
            || self.world.has_component::<Health>(entity)
            || self.world.has_component::<Label>(entity);
        if leftovers {
            return Err(mismatch(
                step,
                format!("recycled entity {entity} still has components"),
            ));
        }
        Ok(())
    }

    fn destroy(&mut self, step: u64, index: usize) -> Result<(), SoakError> {
        self.counts.destroy += 1;
        let entity = self.model.live.swap_remove(index);
        self.model.alive.remove(&entity);

        let before = [
            self.pool_len::<Position>(),
            self.pool_len::<Velocity>(),
            self.pool_len::<Health>(),
            self.pool_len::<Label>(),
        ];
        self.world.destroy(entity);

        self.expect_swept::<Position>(step, entity, before[0])?;
        self.expect_swept::<Velocity>(step, entity, before[1])?;
        self.expect_swept::<Health>(step, entity, before[2])?;
        self.expect_swept::<Label>(step, entity, before[3])
    }

    fn add<T: Tracked>(&mut self, step: u64, entity: EntityId) -> Result<(), SoakError> {
        let value = T::generate(&mut self.values);
        let before = self.pool_len::<T>();
        let replaced = T::column_mut(&mut self.model)
            .insert(entity, value.clone())
            .is_some();

        self.world.add_component(entity, value);

        let expected = if replaced { before } else { before + 1 };
        self.expect_len::<T>(step, expected)?;
        self.expect_value::<T>(step, entity)
    }

    fn remove<T: Tracked>(&mut self, step: u64, entity: EntityId) -> Result<(), SoakError> {
        let before = self.pool_len::<T>();
        let had = T::column_mut(&mut self.model).remove(&entity).is_some();

        let removed = self.world.remove_component::<T>(entity);

        if removed != had {
            return Err(mismatch(
                step,
                format!(
                    "removing {} from {entity}: storage said {removed}, model said {had}",
                    any::type_name::<T>()
                ),
            ));
        }
        self.expect_len::<T>(step, before - usize::from(had))?;
        self.expect_value::<T>(step, entity)
    }

    fn expect_swept<T: Tracked>(
        &mut self,
        step: u64,
        entity: EntityId,
        before: usize,
    ) -> Result<(), SoakError> {
        let had = T::column_mut(&mut self.model).remove(&entity).is_some();
        self.expect_len::<T>(step, before - usize::from(had))?;
        if self.world.has_component::<T>(entity) {
            return Err(mismatch(
                step,
                format!("destroyed {entity} still has {}", any::type_name::<T>()),
            ));
        }
        Ok(())
    }

    fn pool_len<T: Tracked>(&self) -> usize {
        self.world
            .storage()
            .pool::<T>()
            .map_or(0, |pool| pool.size())
    }

    fn expect_len<T: Tracked>(&self, step: u64, expected: usize) -> Result<(), SoakError> {
        let actual = self.pool_len::<T>();
        if actual != expected {
            return Err(mismatch(
                step,
                format!(
                    "{} pool holds {actual} components, expected {expected}",
                    any::type_name::<T>()
                ),
            ));
        }
        Ok(())
    }

    fn expect_value<T: Tracked>(&self, step: u64, entity: EntityId) -> Result<(), SoakError> {
        let expected = T::column(&self.model).get(&entity);
        let actual = self.world.get_component::<T>(entity);
        if actual != expected || self.world.has_component::<T>(entity) != expected.is_some() {
            return Err(mismatch(
                step,
                format!(
                    "{} of {entity}: storage has {actual:?}, model has {expected:?}",
                    any::type_name::<T>()
                ),
            ));
        }
        Ok(())
    }

    fn expect_iteration<T: Tracked>(&self, step: u64) -> Result<(), SoakError> {
        let mut seen = HashMap::new();
        let mut repeated = None;
        self.world.for_each::<T, _>(|entity, value| {
            if seen.insert(entity, value.clone()).is_some() {
                repeated = Some(entity);
            }
        });

        if let Some(entity) = repeated {
            return Err(mismatch(
                step,
                format!("{} visited {entity} twice", any::type_name::<T>()),
            ));
        }
        if &seen != T::column(&self.model) {
            return Err(mismatch(
                step,
                format!(
                    "{} iteration visited {} components, model has {}",
                    any::type_name::<T>(),
                    seen.len(),
                    T::column(&self.model).len()
                ),
            ));
        }
        Ok(())
    }

    fn verify_all(&mut self, step: u64) -> Result<(), SoakError> {
        self.invariant_checks += 1;
        self.world
            .storage()
            .check_invariants()
            .map_err(|source| {
                warn!("invariant check failed at step {step}: {source}");
                SoakError::Invariant { step, source }
            })?;

        if self.world.entity_count() != self.model.live.len() {
            return Err(mismatch(
                step,
                format!(
                    "{} live entities, model has {}",
                    self.world.entity_count(),
                    self.model.live.len()
                ),
            ));
        }

        self.verify_column::<Position>(step)?;
        self.verify_column::<Velocity>(step)?;
        self.verify_column::<Health>(step)?;
        self.verify_column::<Label>(step)
    }

    fn verify_column<T: Tracked>(&self, step: u64) -> Result<(), SoakError> {
        self.expect_len::<T>(step, T::column(&self.model).len())?;
        self.expect_iteration::<T>(step)
    }
}

/// Build and run a workload in one call.
pub fn run_workload(config: WorkloadConfig) -> Result<SoakReport, SoakError> {
    Soak::new(config)?.run()
}
