//! Phase bodies: apply kernels to claimed ranges of the shared buffers.
//!
//! This is the only module in the engine that opens the arena's `unsafe`
//! accessors. Every call follows one of two patterns:
//!
//! - a mutable handle over a range the caller just claimed from the
//!   phase's scheduler. The scheduler never issues overlapping ranges
//!   within one phase, and every other worker in the same phase only
//!   holds its own claims.
//! - a read view over a buffer that no worker writes during the current
//!   phase. The barrier (or merge round transition) before the phase
//!   orders every earlier write before the read.
//!
//! The SAFETY comment on each call names the buffer roles that make it
//! one of the two.

#![allow(unsafe_code)]

use std::cmp::Ordering;

use weft_arena::PipelineBuffers;
use weft_core::{IndexRange, StageKernels};

use crate::merge::RoundPlan;
use crate::scheduler::Claims;

/// Per-run context shared by every worker.
pub(crate) struct StageContext<'a, K> {
    buffers: &'a PipelineBuffers,
    kernels: &'a K,
    initial_run: usize,
}

impl<'a, K: StageKernels> StageContext<'a, K> {
    pub(crate) fn new(buffers: &'a PipelineBuffers, kernels: &'a K, initial_run: usize) -> Self {
        Self {
            buffers,
            kernels,
            initial_run,
        }
    }

    pub(crate) fn generate_a(&self, claims: Claims<'_>) {
        for range in claims {
            // SAFETY: A is written only through claims of this phase.
            let mut a = unsafe { self.buffers.a.exclusive(range) };
            for (i, v) in a.indexed_mut() {
                *v = self.kernels.generate_a(i);
            }
        }
    }

    pub(crate) fn generate_b(&self, claims: Claims<'_>) {
        for range in claims {
            // SAFETY: B is written only through claims of this phase.
            let mut b = unsafe { self.buffers.b.exclusive(range) };
            for (i, v) in b.indexed_mut() {
                *v = self.kernels.generate_b(i);
            }
        }
    }

    pub(crate) fn map_a(&self, claims: Claims<'_>) {
        for range in claims {
            // SAFETY: A is written only through claims of this phase.
            let mut a = unsafe { self.buffers.a.exclusive(range) };
            for v in a.as_mut_slice() {
                *v = self.kernels.map_a(*v);
            }
        }
    }

    /// Snapshot B into scratch so the combine phase can read the
    /// pre-combine left neighbour of every element.
    pub(crate) fn copy_b(&self, claims: Claims<'_>) {
        for range in claims {
            // SAFETY: scratch is written only through claims of this
            // phase; B is read-only here and was last written before the
            // generate barrier.
            let (mut scratch, b) = unsafe {
                (
                    self.buffers.scratch.exclusive(range),
                    self.buffers.b.view(range),
                )
            };
            scratch.as_mut_slice().copy_from_slice(b);
        }
    }

    pub(crate) fn combine_b(&self, claims: Claims<'_>) {
        for range in claims {
            let with_neighbour = IndexRange::new(range.start.saturating_sub(1), range.end);
            // SAFETY: B is written only through claims of this phase;
            // scratch is read-only here and complete after the copy
            // barrier.
            let (mut b, previous) = unsafe {
                (
                    self.buffers.b.exclusive(range),
                    self.buffers.scratch.view(with_neighbour),
                )
            };
            let base = with_neighbour.start;
            for (i, v) in b.indexed_mut() {
                let prev = if i == 0 { 0.0 } else { previous[i - 1 - base] };
                *v = self.kernels.combine_b(*v, prev);
            }
        }
    }

    pub(crate) fn merge(&self, claims: Claims<'_>) {
        for range in claims {
            // SAFETY: B is written only through claims of this phase; A is
            // read-only from the map barrier on.
            let (mut b, a) = unsafe { (self.buffers.b.exclusive(range), self.buffers.a.view(range)) };
            for (v, &x) in b.as_mut_slice().iter_mut().zip(a) {
                *v = self.kernels.merge(x, *v);
            }
        }
    }

    /// Sort each claimed run of `initial_run` elements in place.
    pub(crate) fn chunk_sort(&self, claims: Claims<'_>) {
        let len = self.buffers.b_len();
        for runs in claims {
            let range = runs.scaled(self.initial_run, len);
            // SAFETY: run indices map to disjoint element ranges of B,
            // written only through claims of this phase.
            let b = unsafe { self.buffers.b.exclusive(range) };
            for mut run in b.chunks_aligned(self.initial_run) {
                insertion_sort(run.as_mut_slice(), |x, y| self.kernels.compare(x, y));
            }
        }
    }

    /// Merge every claimed pair of `plan` through scratch and back into B.
    /// Returns the number of elements merged.
    pub(crate) fn merge_round(&self, plan: &RoundPlan, claims: Claims<'_>) -> usize {
        let width = plan.pair_width();
        let mut merged = 0;
        for pairs in claims {
            let range = pairs.scaled(width, plan.mergeable);
            // SAFETY: pair indices of one round map to disjoint element
            // ranges, and both B and scratch are touched only through this
            // round's claims. The previous round's transition happens
            // before any claim of this one.
            let (b, scratch) = unsafe {
                (
                    self.buffers.b.exclusive(range),
                    self.buffers.scratch.exclusive(range),
                )
            };
            let targets = scratch.chunks_aligned(width);
            for (mut src, mut dst) in b.chunks_aligned(width).into_iter().zip(targets) {
                if src.len() <= plan.run_len {
                    continue;
                }
                let (left, right) = src.as_slice().split_at(plan.run_len);
                merge_runs(left, right, dst.as_mut_slice(), |x, y| {
                    self.kernels.compare(x, y)
                });
                src.as_mut_slice().copy_from_slice(dst.as_slice());
                merged += src.len();
            }
        }
        merged
    }

    /// First element of sorted B that is strictly positive.
    pub(crate) fn min_positive(&self) -> Option<f64> {
        // SAFETY: B is read-only from the sort barrier on.
        let b = unsafe { self.buffers.b.view(self.buffers.b.full_range()) };
        let first = b.partition_point(|&v| self.kernels.compare(v, 0.0) != Ordering::Greater);
        b.get(first).copied().filter(|&v| v > 0.0)
    }

    /// Sum of reduce contributions over the claimed ranges of B.
    pub(crate) fn reduce(&self, claims: Claims<'_>, divisor: f64) -> f64 {
        let mut partial = 0.0;
        for range in claims {
            // SAFETY: B is read-only from the sort barrier on.
            let b = unsafe { self.buffers.b.view(range) };
            partial += b
                .iter()
                .map(|&v| self.kernels.reduce_contribution(v, divisor))
                .sum::<f64>();
        }
        partial
    }

    pub(crate) fn len_b(&self) -> usize {
        self.buffers.b_len()
    }
}

fn insertion_sort(data: &mut [f64], compare: impl Fn(f64, f64) -> Ordering) {
    for i in 1..data.len() {
        let mut j = i;
        while j > 0 && compare(data[j - 1], data[j]) == Ordering::Greater {
            data.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Stable two-way merge of sorted `left` and `right` into `out`.
fn merge_runs(left: &[f64], right: &[f64], out: &mut [f64], compare: impl Fn(f64, f64) -> Ordering) {
    debug_assert_eq!(left.len() + right.len(), out.len());
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        let take_left =
            j >= right.len() || (i < left.len() && compare(left[i], right[j]) != Ordering::Greater);
        if take_left {
            *slot = left[i];
            i += 1;
        } else {
            *slot = right[j];
            j += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeCoordinator;
    use crate::scheduler::RangeScheduler;
    use weft_core::{SchedulePolicy, WorkerId};

    /// Index-derived values; B descends so the sort has work to do.
    struct Ramp;

    impl StageKernels for Ramp {
        fn generate_a(&self, index: usize) -> f64 {
            index as f64
        }
        fn generate_b(&self, index: usize) -> f64 {
            1000.0 - index as f64
        }
        fn map_a(&self, value: f64) -> f64 {
            value + 1.0
        }
        fn combine_b(&self, value: f64, previous: f64) -> f64 {
            value + previous
        }
        fn merge(&self, a: f64, b: f64) -> f64 {
            b - a
        }
        fn reduce_contribution(&self, value: f64, divisor: f64) -> f64 {
            value / divisor
        }
    }

    fn total(a: f64, b: f64) -> Ordering {
        a.total_cmp(&b)
    }

    fn all(space: usize) -> RangeScheduler {
        RangeScheduler::new(SchedulePolicy::Static, space, 7, 1)
    }

    #[test]
    fn insertion_sort_orders_ascending() {
        let mut v = [3.0, -1.0, 2.5, 0.0, -7.0, 2.5];
        insertion_sort(&mut v, total);
        assert_eq!(v, [-7.0, -1.0, 0.0, 2.5, 2.5, 3.0]);
    }

    #[test]
    fn merge_runs_interleaves() {
        let mut out = [0.0; 7];
        merge_runs(&[1.0, 4.0, 9.0], &[2.0, 3.0, 10.0, 11.0], &mut out, total);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn combine_reads_pre_combine_neighbour() {
        let bufs = PipelineBuffers::allocate(20).unwrap();
        let ctx = StageContext::new(&bufs, &Ramp, 4);
        ctx.generate_b(all(10).claims(WorkerId(0)));
        ctx.copy_b(all(10).claims(WorkerId(0)));
        ctx.combine_b(all(10).claims(WorkerId(0)));
        let b = bufs.b.into_vec();
        assert_eq!(b[0], 1000.0);
        // 999 + 1000, not 999 + (combined) 1000.
        assert_eq!(b[1], 1999.0);
        assert_eq!(b[9], 991.0 + 992.0);
    }

    #[test]
    fn sequence_leaves_b_sorted() {
        let n = 300;
        let half = n / 2;
        let bufs = PipelineBuffers::allocate(n).unwrap();
        let ctx = StageContext::new(&bufs, &Ramp, 16);
        ctx.generate_a(all(n).claims(WorkerId(0)));
        ctx.generate_b(all(half).claims(WorkerId(0)));
        ctx.map_a(all(n).claims(WorkerId(0)));
        ctx.merge(all(half).claims(WorkerId(0)));
        ctx.chunk_sort(all(half.div_ceil(16)).claims(WorkerId(0)));

        let coordinator = MergeCoordinator::new(half, 16, SchedulePolicy::Static, 1, 1);
        for round in 0..coordinator.rounds() {
            let plan = *coordinator.plan(round).unwrap();
            let merged = ctx.merge_round(&plan, coordinator.scheduler(round).claims(WorkerId(0)));
            assert_eq!(merged, plan.mergeable);
            coordinator.arrive(round, merged);
        }

        // merge gives B[i] = (1000 - i) - (i + 1) = 999 - 2i, descending.
        assert_eq!(ctx.min_positive(), Some(701.0));
        let b = bufs.b.into_vec();
        assert!(b.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(b[0], 701.0);
        assert_eq!(b[half - 1], 999.0);
    }

    #[test]
    fn min_positive_skips_zero_and_negatives() {
        let mut bufs = PipelineBuffers::allocate(10).unwrap();
        bufs.b
            .as_mut_slice()
            .copy_from_slice(&[-2.0, -0.0, 0.0, 0.5, 3.0]);
        let ctx = StageContext::new(&bufs, &Ramp, 4);
        assert_eq!(ctx.min_positive(), Some(0.5));
        let total = ctx.reduce(all(ctx.len_b()).claims(WorkerId(0)), 0.5);
        assert_eq!(total, (-2.0 - 0.0 + 0.0 + 0.5 + 3.0) / 0.5);
    }
}
