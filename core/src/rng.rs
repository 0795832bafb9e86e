//! Deterministic random number generation.
//!
//! RULE: Nothing in the generator may call a platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the single master seed stored on the run record.
//!
//! Each generated attribute gets its own RNG stream, seeded from
//! (master_seed XOR stream_index * golden-ratio constant). This means:
//!   - Adding a new attribute never changes existing attributes' draws.
//!   - Each stream is fully reproducible in isolation.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG for a single attribute stream.
pub struct StreamRng {
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream RNG from the master seed and a stable
    /// stream index. The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform float over the closed range [low, high].
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.inner.gen_range(low..=high)
    }

    /// Uniform integer over the closed range [low, high].
    pub fn uniform_u32(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.inner.gen_range(low..=high)
    }

    /// Uniform pick from a slice. None only for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.next_u64_below(items.len() as u64) as usize;
        items.get(index)
    }

    /// Draw an index from a prepared weighted distribution.
    pub fn weighted(&mut self, weights: &WeightedIndex<f64>) -> usize {
        weights.sample(&mut self.inner)
    }
}

/// All attribute RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_stream(&self, slot: StreamSlot) -> StreamRng {
        StreamRng::new(self.master_seed, slot as u64)
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Operator = 0,
    Category = 1,
    Template = 2,
    Location = 3,
    Date = 4,
    Sentiment = 5,
    Engagement = 6,
}
