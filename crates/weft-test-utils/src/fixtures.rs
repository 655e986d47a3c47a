//! Fixture kernels.
//!
//! - [`ZeroKernels`]: every value is zero, so no positive element survives
//!   the sort and the run must fail with the degenerate-data error.
//! - [`ScrambledKernels`]: small positive integers in a scrambled order,
//!   so every phase does real work and sums are exact in any order.
//! - [`PanickingKernels`]: panics when map-A sees a chosen index.

use weft_core::StageKernels;

/// All-zero data.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroKernels;

impl StageKernels for ZeroKernels {
    fn generate_a(&self, _: usize) -> f64 {
        0.0
    }
    fn generate_b(&self, _: usize) -> f64 {
        0.0
    }
    fn map_a(&self, _: f64) -> f64 {
        0.0
    }
    fn combine_b(&self, _: f64, _: f64) -> f64 {
        0.0
    }
    fn merge(&self, _: f64, _: f64) -> f64 {
        0.0
    }
    fn reduce_contribution(&self, _: f64, _: f64) -> f64 {
        0.0
    }
}

/// Integer-valued data in scrambled order.
///
/// `B[i]` ends up as `(i * 7919) % modulus + 1` after every phase, and
/// the reduce contribution is the value itself, so the final result is
/// an exact integer sum regardless of how the work was split.
#[derive(Clone, Copy, Debug)]
pub struct ScrambledKernels {
    pub modulus: usize,
}

impl ScrambledKernels {
    pub fn new(modulus: usize) -> Self {
        Self { modulus }
    }

    /// The value B holds at `index` once the pipeline has run, before
    /// sorting.
    pub fn value(&self, index: usize) -> f64 {
        (index.wrapping_mul(7919) % self.modulus) as f64 + 1.0
    }

    /// The result a run over `half` B elements must produce.
    pub fn expected_sum(&self, half: usize) -> f64 {
        (0..half).map(|i| self.value(i)).sum()
    }
}

impl StageKernels for ScrambledKernels {
    fn generate_a(&self, _: usize) -> f64 {
        1.0
    }
    fn generate_b(&self, index: usize) -> f64 {
        self.value(index)
    }
    fn map_a(&self, value: f64) -> f64 {
        value
    }
    fn combine_b(&self, value: f64, _: f64) -> f64 {
        value
    }
    fn merge(&self, a: f64, b: f64) -> f64 {
        a * b
    }
    fn reduce_contribution(&self, value: f64, _: f64) -> f64 {
        value
    }
}

/// Panics in map-A at element `at`; otherwise behaves like
/// [`ScrambledKernels`] with modulus 97.
#[derive(Clone, Copy, Debug)]
pub struct PanickingKernels {
    pub at: usize,
}

impl StageKernels for PanickingKernels {
    fn generate_a(&self, index: usize) -> f64 {
        index as f64
    }
    fn generate_b(&self, index: usize) -> f64 {
        ScrambledKernels::new(97).value(index)
    }
    fn map_a(&self, value: f64) -> f64 {
        if value as usize == self.at {
            panic!("map-a fixture panic at {}", self.at);
        }
        1.0
    }
    fn combine_b(&self, value: f64, _: f64) -> f64 {
        value
    }
    fn merge(&self, a: f64, b: f64) -> f64 {
        a * b
    }
    fn reduce_contribution(&self, value: f64, _: f64) -> f64 {
        value
    }
}
