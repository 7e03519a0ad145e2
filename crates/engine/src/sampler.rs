//! Uniform key selection
//!
//! Workers draw primary keys uniformly from `[0, N)` with
//! `rand::distributions::Uniform` over `rand::rngs::StdRng` (ChaCha12).
//! With a configured seed, worker `i` uses stream `seed + i + 1`, so runs
//! are reproducible; without one each sampler is seeded from OS entropy.
//! The unshifted seed belongs to the populator's value generator.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Name of the generator, recorded in reports
pub const SAMPLER_ALGORITHM: &str = "StdRng (ChaCha12), Uniform[0, N)";

/// Per-worker uniform key source
#[derive(Debug, Clone)]
pub struct KeySampler {
    rng: StdRng,
    dist: Uniform<u64>,
}

impl KeySampler {
    /// Sampler over `[0, population)` for worker `stream`
    ///
    /// `population` must be non-zero (guaranteed by `BenchConfig::validate`).
    pub fn new(population: usize, seed: Option<u64>, stream: u64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream).wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            dist: Uniform::new(0, population as u64),
        }
    }

    /// Next key
    #[inline]
    pub fn next_key(&mut self) -> u64 {
        self.dist.sample(&mut self.rng)
    }
}
