//! The reference benchmark workload.

use weft_core::StageKernels;

use crate::generate::IndexSeededUniform;

/// Scale constant of the reference workload. A is drawn from `[1, A)`
/// and B from `[A, 10A)`.
pub const AMPLITUDE: f64 = 637.0;

/// Benchmark kernels, fully determined by a seed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceKernels {
    seed: u64,
    gen_a: IndexSeededUniform,
    gen_b: IndexSeededUniform,
}

impl ReferenceKernels {
    /// Kernels for the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            gen_a: IndexSeededUniform::new(seed, 0, 1.0, AMPLITUDE),
            gen_b: IndexSeededUniform::new(seed, 1, AMPLITUDE, 10.0 * AMPLITUDE),
        }
    }

    /// The seed these kernels were built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl StageKernels for ReferenceKernels {
    fn generate_a(&self, index: usize) -> f64 {
        self.gen_a.sample(index)
    }

    fn generate_b(&self, index: usize) -> f64 {
        self.gen_b.sample(index)
    }

    fn map_a(&self, value: f64) -> f64 {
        (value / std::f64::consts::E).sqrt()
    }

    fn combine_b(&self, value: f64, previous: f64) -> f64 {
        (value + previous).tan().abs()
    }

    fn merge(&self, a: f64, b: f64) -> f64 {
        a * b
    }

    fn reduce_contribution(&self, value: f64, divisor: f64) -> f64 {
        let q = value / divisor;
        // Parity of the integer part; `as` saturates for huge quotients.
        if (q as i64) % 2 == 0 {
            q.sin()
        } else {
            0.0
        }
    }
}
