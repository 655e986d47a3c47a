//! The elementwise kernel contract consumed by the pipeline.
//!
//! Kernels are the engine's boundary to the numeric work. Each method is a
//! pure function of its arguments: no shared state, no I/O, no knowledge
//! of which worker calls it or which range it belongs to. That purity is
//! what lets the engine split the index space any way it likes without
//! changing the result.

use std::cmp::Ordering;

/// Elementwise functions applied by each phase of the pipeline.
///
/// Implementations must be deterministic: the same inputs always produce
/// bit-identical outputs, on any thread.
pub trait StageKernels: Send + Sync {
    /// Value of buffer A at `index` (generate-A phase).
    fn generate_a(&self, index: usize) -> f64;

    /// Value of buffer B at `index` (generate-B phase).
    fn generate_b(&self, index: usize) -> f64;

    /// In-place map of one buffer A element (map-A phase).
    fn map_a(&self, value: f64) -> f64;

    /// Combine one buffer B element with its pre-combine left neighbour
    /// (map-B-combine phase). `previous` is `0.0` for index 0.
    fn combine_b(&self, value: f64, previous: f64) -> f64;

    /// Fold an element of A into the element of B at the same index
    /// (merge phase).
    fn merge(&self, a: f64, b: f64) -> f64;

    /// Contribution of one sorted B element to the final scalar, given the
    /// minimum positive element of B as `divisor` (reduce phase).
    fn reduce_contribution(&self, value: f64, divisor: f64) -> f64;

    /// Total order used by the sort phases. Defaults to IEEE total order.
    fn compare(&self, a: f64, b: f64) -> Ordering {
        a.total_cmp(&b)
    }
}

impl<K: StageKernels + ?Sized> StageKernels for &K {
    fn generate_a(&self, index: usize) -> f64 {
        (**self).generate_a(index)
    }
    fn generate_b(&self, index: usize) -> f64 {
        (**self).generate_b(index)
    }
    fn map_a(&self, value: f64) -> f64 {
        (**self).map_a(value)
    }
    fn combine_b(&self, value: f64, previous: f64) -> f64 {
        (**self).combine_b(value, previous)
    }
    fn merge(&self, a: f64, b: f64) -> f64 {
        (**self).merge(a, b)
    }
    fn reduce_contribution(&self, value: f64, divisor: f64) -> f64 {
        (**self).reduce_contribution(value, divisor)
    }
    fn compare(&self, a: f64, b: f64) -> Ordering {
        (**self).compare(a, b)
    }
}
