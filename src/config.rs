//! Workload configuration for the soak driver

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read workload file: {0}")]
    Io(#[from] std::io::Error),
    #[error("workload parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("workload validation error: {0}")]
    Validation(String),
}

fn default_steps() -> u64 {
    10_000
}

fn default_initial_entities() -> u32 {
    64
}

fn default_check_every() -> u64 {
    500
}

/// A randomized create/destroy/add/remove workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub name: String,
    pub seed: u64,
    #[serde(default = "default_steps")]
    pub steps: u64,
    #[serde(default = "default_initial_entities")]
    pub initial_entities: u32,
    /// Run a full invariant check every this many steps (0 = only at the end).
    #[serde(default = "default_check_every")]
    pub check_every: u64,
    #[serde(default)]
    pub ops: OperationMix,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relative weights of each operation kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMix {
    #[serde(default = "default_create_weight")]
    pub create: u32,
    #[serde(default = "default_destroy_weight")]
    pub destroy: u32,
    #[serde(default = "default_add_weight")]
    pub add: u32,
    #[serde(default = "default_remove_weight")]
    pub remove: u32,
    #[serde(default = "default_get_weight")]
    pub get: u32,
    #[serde(default = "default_iterate_weight")]
    pub iterate: u32,
}

fn default_create_weight() -> u32 {
    10
}

fn default_destroy_weight() -> u32 {
    6
}

fn default_add_weight() -> u32 {
    30
}

fn default_remove_weight() -> u32 {
    15
}

fn default_get_weight() -> u32 {
    35
}

fn default_iterate_weight() -> u32 {
    4
}

impl Default for OperationMix {
    fn default() -> Self {
        Self {
            create: default_create_weight(),
            destroy: default_destroy_weight(),
            add: default_add_weight(),
            remove: default_remove_weight(),
            get: default_get_weight(),
            iterate: default_iterate_weight(),
        }
    }
}

impl OperationMix {
    /// Weights in `create, destroy, add, remove, get, iterate` order.
    pub fn weights(&self) -> [u32; 6] {
        [
            self.create,
            self.destroy,
            self.add,
            self.remove,
            self.get,
            self.iterate,
        ]
    }

    pub fn total(&self) -> u64 {
        self.weights().iter().map(|&w| u64::from(w)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl WorkloadConfig {
    /// Load and validate a workload from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: WorkloadConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "workload name must not be empty".into(),
            ));
        }
        if self.steps == 0 {
            return Err(ConfigError::Validation(
                "steps must be greater than zero".into(),
            ));
        }
        if self.ops.total() == 0 {
            return Err(ConfigError::Validation(
                "operation weights must not all be zero".into(),
            ));
        }
        if self.ops.create == 0 && self.initial_entities == 0 {
            return Err(ConfigError::Validation(
                "workload can never create an entity".into(),
            ));
        }
        Ok(())
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            seed: 42,
            steps: default_steps(),
            initial_entities: default_initial_entities(),
            check_every: default_check_every(),
            ops: OperationMix::default(),
            logging: LoggingConfig::default(),
        }
    }
}
