//! Explicit RNG handle.
//!
//! Spec §5 and §9 require every sampling call in the simulator to draw
//! from one process-wide stream, threaded explicitly rather than read
//! from a thread-local or global generator, so that a seed reproduces a
//! session bit-for-bit. `SimRng` wraps a seeded `StdRng` and carries the
//! handful of distributions (uniform, Gaussian, exponential) the trader
//! and customer-generator layers need, rather than constructing a fresh
//! `Normal`/`Exp` object on every call.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Single source of randomness for one simulation session.
pub struct SimRng {
    rng: StdRng,
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        SimRng { rng: StdRng::seed_from_u64(seed) }
    }

    /// Uniform float in `[0, 1)`.
    pub fn uniform01(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform integer in `[lo, hi]` inclusive.
    pub fn uniform_int(&mut self, lo: i32, hi: i32) -> i32 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform float in `[lo, hi]`.
    pub fn uniform_range(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// A single draw from `Normal(mean, stddev)`. Falls back to `mean`
    /// for a degenerate (non-positive) stddev.
    pub fn gauss(&mut self, mean: f64, stddev: f64) -> f64 {
        if stddev <= 0.0 {
            return mean;
        }
        Normal::new(mean, stddev).expect("valid normal params").sample(&mut self.rng)
    }

    /// Gap between successive Poisson-process arrivals with the given
    /// `rate` (events per second): an exponential draw with mean `1/rate`.
    pub fn exponential_gap(&mut self, rate: f64) -> f64 {
        if rate <= 0.0 {
            return f64::INFINITY;
        }
        -self.uniform01().ln() / rate
    }

    /// Flips a fair coin.
    pub fn coinflip(&mut self) -> bool {
        self.rng.gen::<bool>()
    }

    /// Picks a uniformly random index in `[0, len)`.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }

    /// Shuffles `items` in place (Fisher-Yates via `rand::seq`).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        use rand::seq::SliceRandom;
        items.shuffle(&mut self.rng);
    }
}
