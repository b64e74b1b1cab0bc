//! Deterministic random number generation
//!
//! Each consumer draws from its own ChaCha stream, seeded from the master
//! seed and a stream id, so adding draws to one stream never shifts another.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Stream identifier
pub type StreamId = u32;

/// Picks which operation runs next.
pub const OPERATION_STREAM: StreamId = 1;
/// Picks targets and component values.
pub const VALUE_STREAM: StreamId = 2;

pub struct RngStreams {
    master_seed: u64,
}

impl RngStreams {
    pub fn new(seed: u64) -> Self {
        Self { master_seed: seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn stream(&self, stream_id: StreamId) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.derive_seed(stream_id))
    }

    fn derive_seed(&self, stream_id: StreamId) -> u64 {
        let mut seed = self.master_seed;
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        seed ^= u64::from(stream_id).wrapping_mul(1103515245);
        seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407)
    }
}

impl Default for RngStreams {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Helper functions for common random operations
pub trait RngExt {
    fn random_f32(&mut self, min: f32, max: f32) -> f32;
}

impl<R: Rng> RngExt for R {
    fn random_f32(&mut self, min: f32, max: f32) -> f32 {
        self.gen::<f32>() * (max - min) + min
    }
}
