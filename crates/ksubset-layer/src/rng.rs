use rand::{Rng, RngCore, SeedableRng};
/// Functional-style RNG key system for deterministic random number
/// generation, similar to JAX's key splitting. Keys are u64 seeds; ChaCha8
/// drives both splitting and the uniform draws consumed by the sampler, so
/// a fixed key always reproduces the same subset sample.
use rand_chacha::ChaCha8Rng;

/// An RNG key for deterministic random number generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RngKey(pub u64);

impl RngKey {
    /// Create a new RNG key from a seed.
    pub fn new(seed: u64) -> Self {
        RngKey(seed)
    }

    /// Split this key into `n` independent keys.
    pub fn split(self, n: usize) -> Vec<RngKey> {
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![self];
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.0);
        (0..n).map(|_| RngKey(rng.next_u64())).collect()
    }

    /// Split into exactly two keys (common case).
    pub fn split_two(self) -> (RngKey, RngKey) {
        let keys = self.split(2);
        (keys[0], keys[1])
    }

    /// Get the seed value.
    pub fn seed(&self) -> u64 {
        self.0
    }

    /// Draw `count` uniforms from the open interval (0, 1), clamped away
    /// from the endpoints so `-log(-log(u))` stays finite.
    pub(crate) fn uniform(self, count: usize) -> Vec<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.0);
        (0..count)
            .map(|_| rng.gen_range(1e-10f32..(1.0 - 1e-10)))
            .collect()
    }
}
