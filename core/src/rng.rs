//! Deterministic random number generation.
//!
//! RULE: nothing in the engine calls a platform RNG. The only consumer is
//! synthetic benchmark generation, which is an explicit, seeded operation.
//! Each purpose gets its own PCG stream derived from (seed, stream index),
//! so adding a stream never shifts an existing one.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct SeededRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SeededRng {
    pub fn new(seed: u64, stream: RngStream) -> Self {
        let derived_seed = seed ^ (stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            name:  stream.name(),
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform float in [lo, hi). Returns `lo` when the range is empty.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.next_f64()
    }

    /// Fair coin: +1.0 or -1.0.
    pub fn sign(&mut self) -> f64 {
        if self.inner.next_u64() & 1 == 0 { 1.0 } else { -1.0 }
    }
}

/// Stable stream assignments. Append only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngStream {
    SyntheticBenchmark = 0,
}

impl RngStream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SyntheticBenchmark => "synthetic_benchmark",
        }
    }
}
