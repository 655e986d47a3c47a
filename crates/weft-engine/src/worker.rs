//! Per-thread phase walk.
//!
//! Each worker moves strictly forward through [`PhaseId::ALL`]. In each
//! phase it drains its claims from that phase's scheduler, applies the
//! phase body, then waits at the phase's synchronization point, if it
//! has one.

use weft_core::{PhaseId, RunError, StageKernels, WorkerId};

use crate::barrier::{BarrierBroken, PhaseBarrier, StartGate};
use crate::merge::{MergeCoordinator, RoundOutcome};
use crate::scheduler::PhaseSchedulers;
use crate::stage::StageContext;

/// The barriers of one run.
///
/// Barriers the driver observes have `workers + 1` parties; the two
/// internal ones (`copy`, `sort-entry`) have `workers`.
pub(crate) struct RunBarriers {
    generate: PhaseBarrier,
    copy: PhaseBarrier,
    map: PhaseBarrier,
    merge: PhaseBarrier,
    sort_entry: PhaseBarrier,
    sort: PhaseBarrier,
    reduce: PhaseBarrier,
}

impl RunBarriers {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            generate: PhaseBarrier::new("generate", workers + 1),
            copy: PhaseBarrier::new("copy", workers),
            map: PhaseBarrier::new("map", workers + 1),
            merge: PhaseBarrier::new("merge", workers + 1),
            sort_entry: PhaseBarrier::new("sort-entry", workers),
            sort: PhaseBarrier::new("sort", workers + 1),
            reduce: PhaseBarrier::new("reduce", workers + 1),
        }
    }

    /// The barriers the driver waits on, with the cumulative progress
    /// percentage reached once each is passed.
    pub(crate) fn driver_observed(&self) -> [(&PhaseBarrier, u8); 5] {
        [
            (&self.generate, 10),
            (&self.map, 30),
            (&self.merge, 40),
            (&self.sort, 90),
            (&self.reduce, 100),
        ]
    }

    /// Synchronization point at the end of `phase`.
    fn after(&self, phase: PhaseId) -> Option<&PhaseBarrier> {
        match phase {
            PhaseId::GenerateA | PhaseId::MapA => None,
            PhaseId::GenerateB => Some(&self.generate),
            PhaseId::MapBCopy => Some(&self.copy),
            PhaseId::MapBCombine => Some(&self.map),
            PhaseId::Merge => Some(&self.merge),
            PhaseId::ChunkSort => Some(&self.sort_entry),
            PhaseId::IterativeMerge => Some(&self.sort),
            PhaseId::Reduce => Some(&self.reduce),
        }
    }

    fn break_all(&self) {
        for barrier in [
            &self.generate,
            &self.copy,
            &self.map,
            &self.merge,
            &self.sort_entry,
            &self.sort,
            &self.reduce,
        ] {
            barrier.break_barrier();
        }
    }
}

/// Everything a worker team shares for one run.
pub(crate) struct RunShared<'a, K> {
    pub(crate) stage: StageContext<'a, K>,
    pub(crate) schedulers: PhaseSchedulers,
    pub(crate) merge: MergeCoordinator,
    pub(crate) barriers: RunBarriers,
    pub(crate) gate: StartGate,
}

impl<K> RunShared<'_, K> {
    /// Release every blocked thread of the run after a panic.
    pub(crate) fn abort(&self) {
        self.gate.abort();
        self.barriers.break_all();
        self.merge.abort();
    }
}

/// Breaks the run's synchronization points if the owning worker unwinds.
struct AbortOnPanic<'r, 'a, K> {
    shared: &'r RunShared<'a, K>,
}

impl<K> Drop for AbortOnPanic<'_, '_, K> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.shared.abort();
        }
    }
}

/// Why a worker stopped before the end of the sequence.
enum Halt {
    /// The team was torn down by a panicking thread.
    Aborted,
}

impl From<BarrierBroken> for Halt {
    fn from(_: BarrierBroken) -> Self {
        Halt::Aborted
    }
}

/// One worker's walk through the fixed phase sequence.
pub(crate) struct WorkerLoop<'r, 'a, K> {
    id: WorkerId,
    shared: &'r RunShared<'a, K>,
}

impl<'r, 'a, K: StageKernels> WorkerLoop<'r, 'a, K> {
    pub(crate) fn new(id: WorkerId, shared: &'r RunShared<'a, K>) -> Self {
        Self { id, shared }
    }

    /// Run every phase and return this worker's partial reduce sum.
    ///
    /// Returns `Ok(0.0)` without touching any buffer if the start gate
    /// is aborted, and also when the team is torn down by another
    /// thread's panic; the driver reports the panic itself in that case.
    pub(crate) fn run(self) -> Result<f64, RunError> {
        let _guard = AbortOnPanic {
            shared: self.shared,
        };
        if !self.shared.gate.wait() {
            log::trace!("worker {} released by aborted start gate", self.id);
            return Ok(0.0);
        }
        match self.walk() {
            Ok(partial) => partial,
            Err(Halt::Aborted) => {
                log::debug!("worker {} stopping: run aborted", self.id);
                Ok(0.0)
            }
        }
    }

    fn walk(&self) -> Result<Result<f64, RunError>, Halt> {
        let mut partial = Ok(0.0);
        let mut phase = Some(PhaseId::GenerateA);
        while let Some(current) = phase {
            log::trace!("worker {} entering {current}", self.id);
            if let Some(result) = self.execute(current)? {
                partial = result;
            }
            if let Some(barrier) = self.shared.barriers.after(current) {
                barrier.arrive_and_wait()?;
            }
            phase = current.next();
        }
        log::debug!("worker {} finished", self.id);
        Ok(partial)
    }

    /// Apply `phase` to every claim. Only reduce yields a result.
    fn execute(&self, phase: PhaseId) -> Result<Option<Result<f64, RunError>>, Halt> {
        if phase == PhaseId::IterativeMerge {
            return self.merge_rounds().map(|()| None);
        }
        let RunShared { stage, schedulers, .. } = self.shared;
        let Some(claims) = schedulers.claims(phase, self.id) else {
            return Ok(None);
        };
        match phase {
            PhaseId::GenerateA => stage.generate_a(claims),
            PhaseId::GenerateB => stage.generate_b(claims),
            PhaseId::MapA => stage.map_a(claims),
            PhaseId::MapBCopy => stage.copy_b(claims),
            PhaseId::MapBCombine => stage.combine_b(claims),
            PhaseId::Merge => stage.merge(claims),
            PhaseId::ChunkSort => stage.chunk_sort(claims),
            PhaseId::IterativeMerge => {}
            PhaseId::Reduce => {
                // Every worker finds the same minimum in the sorted buffer,
                // so either all of them reduce or none do.
                let result = match stage.min_positive() {
                    Some(min) => Ok(stage.reduce(claims, min)),
                    None => Err(RunError::NoPositiveElement {
                        searched: stage.len_b(),
                    }),
                };
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Take part in every merge round, claiming pairs from each round's
    /// scheduler.
    fn merge_rounds(&self) -> Result<(), Halt> {
        let RunShared { stage, merge, .. } = self.shared;
        for round in 0..merge.rounds() {
            let Some(plan) = merge.plan(round) else { break };
            let merged = stage.merge_round(plan, merge.scheduler(round).claims(self.id));
            log::trace!("worker {} merged {merged} elements in round {round}", self.id);
            if merge.arrive(round, merged) == RoundOutcome::Aborted {
                return Err(Halt::Aborted);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_arena::PipelineBuffers;
    use weft_core::SchedulePolicy;

    use crate::scheduler::RangeScheduler;

    struct Constant(f64);

    impl StageKernels for Constant {
        fn generate_a(&self, _: usize) -> f64 {
            self.0
        }
        fn generate_b(&self, _: usize) -> f64 {
            self.0
        }
        fn map_a(&self, value: f64) -> f64 {
            value
        }
        fn combine_b(&self, value: f64, _: f64) -> f64 {
            value
        }
        fn merge(&self, _: f64, b: f64) -> f64 {
            b
        }
        fn reduce_contribution(&self, value: f64, divisor: f64) -> f64 {
            value / divisor
        }
    }

    fn shared<'a, K: StageKernels>(
        bufs: &'a PipelineBuffers,
        kernels: &'a K,
        workers: usize,
    ) -> RunShared<'a, K> {
        team(bufs, kernels, workers, SchedulePolicy::Static, 8, 8)
    }

    fn team<'a, K: StageKernels>(
        bufs: &'a PipelineBuffers,
        kernels: &'a K,
        workers: usize,
        policy: SchedulePolicy,
        initial_run: usize,
        chunk: usize,
    ) -> RunShared<'a, K> {
        RunShared {
            stage: StageContext::new(bufs, kernels, initial_run),
            schedulers: PhaseSchedulers::for_problem(bufs.a_len(), initial_run, policy, chunk, workers),
            merge: MergeCoordinator::new(bufs.b_len(), initial_run, policy, chunk, workers),
            barriers: RunBarriers::new(workers),
            gate: StartGate::new(),
        }
    }

    /// Run a full team, standing in for the driver at its barriers.
    fn run_team<K: StageKernels>(shared: &RunShared<'_, K>, workers: usize) -> Vec<Result<f64, RunError>> {
        shared.gate.open();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers as u32)
                .map(|w| s.spawn(move || WorkerLoop::new(WorkerId(w), shared).run()))
                .collect();
            for (barrier, _) in shared.barriers.driver_observed() {
                barrier.arrive_and_wait().unwrap();
            }
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn barrier_arities_follow_driver_participation() {
        let b = RunBarriers::new(4);
        let observed: Vec<_> = b.driver_observed().iter().map(|(b, p)| (b.name(), b.parties(), *p)).collect();
        assert_eq!(
            observed,
            [
                ("generate", 5, 10),
                ("map", 5, 30),
                ("merge", 5, 40),
                ("sort", 5, 90),
                ("reduce", 5, 100),
            ]
        );
        assert_eq!(b.copy.parties(), 4);
        assert_eq!(b.sort_entry.parties(), 4);
        assert!(b.after(PhaseId::GenerateA).is_none());
        assert_eq!(b.after(PhaseId::ChunkSort).map(PhaseBarrier::name), Some("sort-entry"));
    }

    #[test]
    fn aborted_gate_skips_every_phase() {
        let bufs = PipelineBuffers::allocate(64).unwrap();
        let kernels = Constant(3.0);
        let shared = shared(&bufs, &kernels, 1);
        shared.gate.abort();
        let result = WorkerLoop::new(WorkerId(0), &shared).run();
        assert_eq!(result, Ok(0.0));
        assert_eq!(shared.schedulers.get(PhaseId::GenerateA).map(RangeScheduler::issued), Some(0));
    }

    #[test]
    fn degenerate_data_fails_every_worker() {
        let bufs = PipelineBuffers::allocate(64).unwrap();
        let kernels = Constant(0.0);
        let shared = shared(&bufs, &kernels, 2);
        let results = run_team(&shared, 2);
        for r in results {
            assert_eq!(r, Err(RunError::NoPositiveElement { searched: 32 }));
        }
    }

    #[test]
    fn panic_guard_releases_waiting_team() {
        let bufs = PipelineBuffers::allocate(64).unwrap();
        let kernels = Constant(1.0);
        let shared = shared(&bufs, &kernels, 2);
        shared.gate.open();
        std::thread::scope(|s| {
            let survivor = s.spawn(|| WorkerLoop::new(WorkerId(0), &shared).run());
            let doomed = s.spawn(|| {
                let _guard = AbortOnPanic { shared: &shared };
                panic!("kernel failure");
            });
            assert!(doomed.join().is_err());
            assert_eq!(survivor.join().unwrap(), Ok(0.0));
        });
        assert!(shared.barriers.generate.is_broken());
    }

    /// B holds a permutation-like spread of positive values with repeats;
    /// every other kernel leaves B alone.
    struct Spread;

    impl StageKernels for Spread {
        fn generate_a(&self, index: usize) -> f64 {
            index as f64
        }
        fn generate_b(&self, index: usize) -> f64 {
            ((index * 7919) % 1009) as f64 + 1.0
        }
        fn map_a(&self, value: f64) -> f64 {
            value
        }
        fn combine_b(&self, value: f64, _: f64) -> f64 {
            value
        }
        fn merge(&self, _: f64, b: f64) -> f64 {
            b
        }
        fn reduce_contribution(&self, value: f64, _: f64) -> f64 {
            value
        }
    }

    #[test]
    fn team_merge_leaves_b_fully_sorted() {
        let cases = [
            (2000, 8, 8, 4),
            (1234, 5, 7, 3),
            (4097, 16, 16, 64),
            (600, 3, 64, 64),
            (90, 12, 5, 1),
        ];
        for (n, workers, initial_run, chunk) in cases {
            let mut expected: Vec<f64> = (0..n / 2).map(|i| Spread.generate_b(i)).collect();
            expected.sort_by(f64::total_cmp);
            for policy in SchedulePolicy::ALL {
                let bufs = PipelineBuffers::allocate(n).unwrap();
                let shared = team(&bufs, &Spread, workers, policy, initial_run, chunk);
                let results = run_team(&shared, workers);
                assert!(results.iter().all(Result::is_ok), "{policy} n={n}");
                assert_eq!(shared.merge.rounds_completed(), shared.merge.rounds());
                drop(shared);
                assert_eq!(
                    bufs.b.into_vec(),
                    expected,
                    "{policy} n={n} workers={workers} run={initial_run} chunk={chunk}"
                );
            }
        }
    }
}
