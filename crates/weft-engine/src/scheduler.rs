//! Range scheduling: static, dynamic and guided work distribution.
//!
//! A [`RangeScheduler`] owns one index space for one phase (or one merge
//! round) and hands out non-overlapping [`IndexRange`]s to the workers that
//! call it until the space is exhausted. Every policy satisfies the same
//! contract: across all workers, the union of returned ranges covers
//! `[0, space_size)` exactly once.
//!
//! Schedulers are plain objects owning their own cursor and lock, built
//! per phase and shared by reference with the worker team. There is no
//! global cursor table.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use weft_core::{IndexRange, PhaseId, SchedulePolicy, WorkerId};

use crate::barrier::lock;

/// Per-worker claim state for one scheduler.
///
/// The static policy derives each claim from `(worker, calls)`; the
/// shared-cursor policies only use the worker id for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerSlot {
    worker: WorkerId,
    calls: usize,
}

impl WorkerSlot {
    /// Fresh slot for `worker` with no claims made.
    pub fn new(worker: WorkerId) -> Self {
        Self { worker, calls: 0 }
    }

    /// The worker this slot belongs to.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Number of non-empty ranges claimed through this slot.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

/// Hands out disjoint ranges of one index space to a worker team.
#[derive(Debug)]
pub struct RangeScheduler {
    policy: SchedulePolicy,
    space_size: usize,
    chunk_size: usize,
    workers: usize,
    /// Next unclaimed offset. Only touched by the shared-cursor policies.
    cursor: Mutex<usize>,
    /// Non-empty ranges issued so far, for diagnostics.
    issued: AtomicU64,
}

// Compile-time assertion: RangeScheduler must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<RangeScheduler>();
};

impl RangeScheduler {
    /// Create a scheduler over `[0, space_size)`.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` or `workers` is zero.
    pub fn new(policy: SchedulePolicy, space_size: usize, chunk_size: usize, workers: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        assert!(workers > 0, "worker count must be positive");
        Self {
            policy,
            space_size,
            chunk_size,
            workers,
            cursor: Mutex::new(0),
            issued: AtomicU64::new(0),
        }
    }

    /// The next range for the worker owning `slot`.
    ///
    /// Returns the empty sentinel once the space is exhausted for this
    /// worker (static) or for everyone (dynamic, guided). An empty result
    /// never mutates the cursor or the slot, so repeated calls after
    /// exhaustion are idempotent no-ops.
    pub fn next(&self, slot: &mut WorkerSlot) -> IndexRange {
        let range = match self.policy {
            SchedulePolicy::Static => self.next_static(slot),
            SchedulePolicy::Dynamic => self.next_shared(|_| self.chunk_size),
            SchedulePolicy::Guided => self.next_shared(|remaining| {
                (remaining / self.workers).max(self.chunk_size)
            }),
        };
        if !range.is_empty() {
            slot.calls += 1;
            self.issued.fetch_add(1, Ordering::Relaxed);
            log::trace!(
                "worker {} claimed {range} of {} ({})",
                slot.worker,
                self.space_size,
                self.policy
            );
        }
        range
    }

    /// Iterator over every non-empty range `worker` can claim.
    pub fn claims(&self, worker: WorkerId) -> Claims<'_> {
        Claims {
            scheduler: self,
            slot: WorkerSlot::new(worker),
        }
    }

    fn next_static(&self, slot: &WorkerSlot) -> IndexRange {
        debug_assert!(
            slot.worker.index() < self.workers,
            "worker {} outside team of {}",
            slot.worker,
            self.workers
        );
        let start = slot
            .calls
            .saturating_mul(self.workers)
            .saturating_add(slot.worker.index())
            .saturating_mul(self.chunk_size);
        IndexRange::clipped(start, self.chunk_size, self.space_size)
    }

    /// Claim from the shared cursor; `chunk_for(remaining)` sizes the claim.
    fn next_shared(&self, chunk_for: impl FnOnce(usize) -> usize) -> IndexRange {
        let mut cursor = lock(&self.cursor);
        let start = *cursor;
        if start >= self.space_size {
            return IndexRange::empty(start);
        }
        let len = chunk_for(self.space_size - start);
        let range = IndexRange::clipped(start, len, self.space_size);
        *cursor = range.end;
        range
    }

    /// The policy in effect.
    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    /// Size of the index space.
    pub fn space_size(&self) -> usize {
        self.space_size
    }

    /// Configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Worker team size.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of non-empty ranges issued so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

/// Iterator over one worker's claims from a [`RangeScheduler`].
///
/// Only a scheduler can create this, so a `Claims` value carries the
/// scheduler's guarantee that its ranges are disjoint from every other
/// worker's claims on the same scheduler.
#[derive(Debug)]
pub struct Claims<'s> {
    scheduler: &'s RangeScheduler,
    slot: WorkerSlot,
}

impl Claims<'_> {
    /// The worker making the claims.
    pub fn worker(&self) -> WorkerId {
        self.slot.worker
    }
}

impl Iterator for Claims<'_> {
    type Item = IndexRange;

    fn next(&mut self) -> Option<IndexRange> {
        let range = self.scheduler.next(&mut self.slot);
        (!range.is_empty()).then_some(range)
    }
}

/// Chunk size, in units of `unit_width` elements, for schedulers whose
/// index space counts runs or merge pairs rather than elements.
pub(crate) fn unit_chunk(chunk_size: usize, unit_width: usize) -> usize {
    (chunk_size / unit_width.max(1)).max(1)
}

// ── PhaseSchedulers ──────────────────────────────────────────────

/// One scheduler per pipeline phase, sized for a given problem.
///
/// The iterative-merge phase has none here: its per-round schedulers
/// belong to the [`MergeCoordinator`](crate::MergeCoordinator).
#[derive(Debug)]
pub struct PhaseSchedulers {
    phases: Vec<Option<RangeScheduler>>,
}

impl PhaseSchedulers {
    /// Build schedulers for a problem of size `problem_size`.
    pub fn for_problem(
        problem_size: usize,
        initial_run: usize,
        policy: SchedulePolicy,
        chunk_size: usize,
        workers: usize,
    ) -> Self {
        let half = problem_size / 2;
        let phases = PhaseId::ALL
            .iter()
            .map(|&phase| {
                let (space, chunk) = match phase {
                    PhaseId::GenerateA | PhaseId::MapA => (problem_size, chunk_size),
                    PhaseId::GenerateB
                    | PhaseId::MapBCopy
                    | PhaseId::MapBCombine
                    | PhaseId::Merge
                    | PhaseId::Reduce => (half, chunk_size),
                    PhaseId::ChunkSort => (
                        half.div_ceil(initial_run),
                        unit_chunk(chunk_size, initial_run),
                    ),
                    PhaseId::IterativeMerge => return None,
                };
                Some(RangeScheduler::new(policy, space, chunk, workers))
            })
            .collect();
        Self { phases }
    }

    /// The scheduler for `phase`, or `None` for the iterative merge.
    pub fn get(&self, phase: PhaseId) -> Option<&RangeScheduler> {
        self.phases[phase.index()].as_ref()
    }

    /// `next(phase, worker)`: the next range of `phase` for `slot`'s worker.
    /// Always empty for the iterative merge.
    pub fn next(&self, phase: PhaseId, slot: &mut WorkerSlot) -> IndexRange {
        match self.get(phase) {
            Some(scheduler) => scheduler.next(slot),
            None => IndexRange::empty(0),
        }
    }

    /// Iterator over `worker`'s claims in `phase`.
    pub fn claims(&self, phase: PhaseId, worker: WorkerId) -> Option<Claims<'_>> {
        self.get(phase).map(|scheduler| scheduler.claims(worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Drain a scheduler round-robin across all workers and return every
    /// range issued.
    fn drain_round_robin(s: &RangeScheduler) -> Vec<IndexRange> {
        let mut slots: Vec<_> = (0..s.workers() as u32).map(|w| WorkerSlot::new(WorkerId(w))).collect();
        let mut done = vec![false; slots.len()];
        let mut out = Vec::new();
        while done.iter().any(|d| !d) {
            for (i, slot) in slots.iter_mut().enumerate() {
                if done[i] {
                    continue;
                }
                let r = s.next(slot);
                if r.is_empty() {
                    done[i] = true;
                } else {
                    out.push(r);
                }
            }
        }
        out
    }

    fn assert_exact_cover(mut ranges: Vec<IndexRange>, space: usize) {
        ranges.sort_by_key(|r| r.start);
        let mut expected = 0;
        for r in &ranges {
            assert!(!r.is_empty());
            assert_eq!(r.start, expected, "gap or overlap at {r}");
            expected = r.end;
        }
        assert_eq!(expected, space);
    }

    #[test]
    fn static_interleaves_by_worker() {
        let s = RangeScheduler::new(SchedulePolicy::Static, 1000, 64, 4);
        let mut w1 = WorkerSlot::new(WorkerId(1));
        assert_eq!(s.next(&mut w1), IndexRange::new(64, 128));
        assert_eq!(s.next(&mut w1), IndexRange::new(320, 384));
        assert_eq!(w1.calls(), 2);
    }

    #[test]
    fn static_clips_last_chunk() {
        let s = RangeScheduler::new(SchedulePolicy::Static, 100, 64, 1);
        let mut w = WorkerSlot::new(WorkerId(0));
        assert_eq!(s.next(&mut w), IndexRange::new(0, 64));
        assert_eq!(s.next(&mut w), IndexRange::new(64, 100));
        assert!(s.next(&mut w).is_empty());
    }

    #[test]
    fn dynamic_advances_shared_cursor() {
        let s = RangeScheduler::new(SchedulePolicy::Dynamic, 150, 64, 2);
        let mut a = WorkerSlot::new(WorkerId(0));
        let mut b = WorkerSlot::new(WorkerId(1));
        assert_eq!(s.next(&mut b), IndexRange::new(0, 64));
        assert_eq!(s.next(&mut b), IndexRange::new(64, 128));
        assert_eq!(s.next(&mut a), IndexRange::new(128, 150));
        assert!(s.next(&mut a).is_empty());
    }

    #[test]
    fn guided_shrinks_to_minimum_chunk() {
        let s = RangeScheduler::new(SchedulePolicy::Guided, 1000, 10, 4);
        let mut w = WorkerSlot::new(WorkerId(0));
        let sizes: Vec<usize> = std::iter::from_fn(|| {
            let r = s.next(&mut w);
            (!r.is_empty()).then(|| r.len())
        })
        .collect();
        // remaining / 4 while that exceeds 10, then 10.
        assert_eq!(&sizes[..4], &[250, 187, 140, 105]);
        assert!(sizes.windows(2).all(|p| p[0] >= p[1]));
        assert!(*sizes.last().unwrap() <= 10);
        assert_eq!(sizes.iter().sum::<usize>(), 1000);
    }

    #[test]
    fn exhausted_calls_are_idempotent() {
        for policy in SchedulePolicy::ALL {
            let s = RangeScheduler::new(policy, 10, 4, 2);
            let mut slot = WorkerSlot::new(WorkerId(0));
            while !s.next(&mut slot).is_empty() {}
            let calls = slot.calls();
            let issued = s.issued();
            let first = s.next(&mut slot);
            let second = s.next(&mut slot);
            assert!(first.is_empty() && second.is_empty());
            assert_eq!(first, second, "{policy}");
            assert_eq!(slot.calls(), calls);
            assert_eq!(s.issued(), issued);
        }
    }

    #[test]
    fn empty_space_yields_nothing() {
        for policy in SchedulePolicy::ALL {
            let s = RangeScheduler::new(policy, 0, 8, 3);
            assert_eq!(s.claims(WorkerId(2)).count(), 0);
        }
    }

    #[test]
    fn concurrent_claims_cover_exactly_once() {
        for policy in SchedulePolicy::ALL {
            let s = RangeScheduler::new(policy, 10_007, 13, 8);
            let per_worker: Vec<Vec<IndexRange>> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..8u32)
                    .map(|w| {
                        let s = &s;
                        scope.spawn(move || s.claims(WorkerId(w)).collect::<Vec<_>>())
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            assert_exact_cover(per_worker.into_iter().flatten().collect(), 10_007);
        }
    }

    #[test]
    fn phase_schedulers_size_each_phase() {
        let p = PhaseSchedulers::for_problem(1000, 64, SchedulePolicy::Dynamic, 64, 4);
        let space = |phase| p.get(phase).map(RangeScheduler::space_size);
        assert_eq!(space(PhaseId::GenerateA), Some(1000));
        assert_eq!(space(PhaseId::GenerateB), Some(500));
        assert_eq!(space(PhaseId::ChunkSort), Some(8));
        assert_eq!(p.get(PhaseId::ChunkSort).map(RangeScheduler::chunk_size), Some(1));
        assert_eq!(space(PhaseId::Reduce), Some(500));
        let mut slot = WorkerSlot::new(WorkerId(0));
        assert_eq!(p.next(PhaseId::MapA, &mut slot), IndexRange::new(0, 64));
        // Phases have independent cursors.
        assert_eq!(p.next(PhaseId::MapBCopy, &mut WorkerSlot::new(WorkerId(0))).start, 0);
    }

    #[test]
    fn iterative_merge_has_no_phase_scheduler() {
        let p = PhaseSchedulers::for_problem(1000, 64, SchedulePolicy::Static, 64, 4);
        assert!(p.get(PhaseId::IterativeMerge).is_none());
        assert!(p.claims(PhaseId::IterativeMerge, WorkerId(0)).is_none());
        let mut slot = WorkerSlot::new(WorkerId(0));
        assert!(p.next(PhaseId::IterativeMerge, &mut slot).is_empty());
        assert_eq!(slot.calls(), 0);
    }

    #[test]
    fn unit_chunk_never_drops_to_zero() {
        assert_eq!(unit_chunk(64, 64), 1);
        assert_eq!(unit_chunk(64, 256), 1);
        assert_eq!(unit_chunk(256, 16), 16);
        assert_eq!(unit_chunk(5, 0), 5);
    }

    fn arb_policy() -> impl Strategy<Value = SchedulePolicy> {
        prop_oneof![
            Just(SchedulePolicy::Static),
            Just(SchedulePolicy::Dynamic),
            Just(SchedulePolicy::Guided),
        ]
    }

    proptest! {
        #[test]
        fn every_policy_partitions_the_space(
            policy in arb_policy(),
            space in 0usize..5_000,
            chunk in 1usize..200,
            workers in 1usize..17,
        ) {
            let s = RangeScheduler::new(policy, space, chunk, workers);
            let mut ranges = drain_round_robin(&s);
            ranges.sort_by_key(|r| r.start);
            let mut expected = 0;
            for r in &ranges {
                prop_assert_eq!(r.start, expected);
                prop_assert!(r.end > r.start);
                expected = r.end;
            }
            prop_assert_eq!(expected, space);
        }
    }
}
