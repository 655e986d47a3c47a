//! Round coordination for the iterative bottom-up merge.
//!
//! After chunk-sort, buffer B holds sorted runs of `initial_run`
//! elements. Each merge round joins adjacent pairs of runs, doubling the
//! run length, until one run covers the whole space. The number of pairs
//! halves every round and soon drops below the worker count, so a
//! barrier sized for the team cannot separate rounds. Instead each
//! worker reports how many elements it merged, and the arrival that
//! completes the round's total performs the transition and wakes the
//! rest.
//!
//! ```text
//!  round 0: [r][r][r][r][r][r][r][r]   4 pairs, run_len = r
//!  round 1: [ 2r ][ 2r ][ 2r ][ 2r ]   2 pairs, run_len = 2r
//!  round 2: [    4r    ][    4r    ]   1 pair,  run_len = 4r
//!  done:    [          8r          ]
//! ```

use std::sync::{Condvar, Mutex, PoisonError};

use smallvec::SmallVec;
use weft_core::SchedulePolicy;

use crate::barrier::lock;
use crate::scheduler::{unit_chunk, RangeScheduler};

/// Static shape of one merge round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundPlan {
    /// Zero-based round number.
    pub round: usize,
    /// Length of the sorted runs entering this round.
    pub run_len: usize,
    /// Number of run pairs that have a right-hand partner.
    pub pair_count: usize,
    /// Elements merged this round: the space minus a trailing run with no
    /// partner, which is already sorted and stays where it is.
    pub mergeable: usize,
}

impl RoundPlan {
    /// Width of one merge pair in elements.
    pub fn pair_width(&self) -> usize {
        self.run_len * 2
    }
}

/// Plan every round for `space` elements starting from runs of
/// `initial_run`. Rounds continue while the run length is below `space`.
fn plan_rounds(space: usize, initial_run: usize) -> SmallVec<[RoundPlan; 16]> {
    let mut plans = SmallVec::new();
    let mut run_len = initial_run;
    while run_len < space {
        let width = run_len * 2;
        let pair_count = (space - run_len).div_ceil(width);
        plans.push(RoundPlan {
            round: plans.len(),
            run_len,
            pair_count,
            mergeable: (pair_count * width).min(space),
        });
        run_len = width;
    }
    plans
}

/// Outcome of [`MergeCoordinator::arrive`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The round was completed by another arrival; carry on.
    Continue,
    /// This arrival completed the round and performed the transition.
    Advance,
    /// The coordinator was aborted before the round completed.
    Aborted,
}

#[derive(Debug)]
struct RoundState {
    round: usize,
    run_len: usize,
    merged: usize,
    aborted: bool,
}

/// Counting-and-broadcast round barrier for the iterative merge.
#[derive(Debug)]
pub struct MergeCoordinator {
    space_size: usize,
    initial_run: usize,
    plans: SmallVec<[RoundPlan; 16]>,
    schedulers: Vec<RangeScheduler>,
    state: Mutex<RoundState>,
    advanced: Condvar,
}

// Compile-time assertion: MergeCoordinator must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<MergeCoordinator>();
};

impl MergeCoordinator {
    /// Plan the merge of `space_size` elements sorted in runs of
    /// `initial_run`, with one scheduler per round over its merge pairs.
    ///
    /// # Panics
    ///
    /// Panics if `initial_run`, `chunk_size` or `workers` is zero.
    pub fn new(
        space_size: usize,
        initial_run: usize,
        policy: SchedulePolicy,
        chunk_size: usize,
        workers: usize,
    ) -> Self {
        assert!(initial_run > 0, "initial_run must be positive");
        let plans = plan_rounds(space_size, initial_run);
        let schedulers = plans
            .iter()
            .map(|plan| {
                RangeScheduler::new(
                    policy,
                    plan.pair_count,
                    unit_chunk(chunk_size, plan.pair_width()),
                    workers,
                )
            })
            .collect();
        Self {
            space_size,
            initial_run,
            plans,
            schedulers,
            state: Mutex::new(RoundState {
                round: 0,
                run_len: initial_run,
                merged: 0,
                aborted: false,
            }),
            advanced: Condvar::new(),
        }
    }

    /// Report `contributed` merged elements for `round` and wait for the
    /// round to complete.
    ///
    /// Every worker arrives once per round after exhausting that round's
    /// claims, including workers that merged nothing. An arrival for a
    /// round that has already completed returns immediately.
    pub fn arrive(&self, round: usize, contributed: usize) -> RoundOutcome {
        let mut state = lock(&self.state);
        if state.aborted {
            return RoundOutcome::Aborted;
        }
        if state.round != round {
            debug_assert!(
                state.round > round && contributed == 0,
                "late arrival for round {round} carried {contributed} elements"
            );
            return RoundOutcome::Continue;
        }
        let plan = self.plans[round];
        state.merged += contributed;
        debug_assert!(
            state.merged <= plan.mergeable,
            "round {round} merged {} of {}",
            state.merged,
            plan.mergeable
        );
        if state.merged >= plan.mergeable {
            debug_assert_eq!(state.run_len, plan.run_len, "run length doubled out of turn");
            state.merged = 0;
            state.run_len *= 2;
            state.round += 1;
            drop(state);
            self.advanced.notify_all();
            log::debug!(
                "merge round {round} complete: {} elements in runs of {}",
                plan.mergeable,
                plan.pair_width()
            );
            return RoundOutcome::Advance;
        }
        while state.round == round && !state.aborted {
            state = self
                .advanced
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.round == round {
            return RoundOutcome::Aborted;
        }
        RoundOutcome::Continue
    }

    /// Wake every waiter with [`RoundOutcome::Aborted`] and fail all
    /// later arrivals.
    pub fn abort(&self) {
        let mut state = lock(&self.state);
        if !state.aborted {
            state.aborted = true;
            drop(state);
            self.advanced.notify_all();
        }
    }

    /// Plan for `round`, if it exists.
    pub fn plan(&self, round: usize) -> Option<&RoundPlan> {
        self.plans.get(round)
    }

    /// All round plans in order.
    pub fn plans(&self) -> &[RoundPlan] {
        &self.plans
    }

    /// Scheduler over the merge pairs of `round`.
    ///
    /// # Panics
    ///
    /// Panics if `round >= self.rounds()`.
    pub fn scheduler(&self, round: usize) -> &RangeScheduler {
        &self.schedulers[round]
    }

    /// Total number of rounds.
    pub fn rounds(&self) -> usize {
        self.plans.len()
    }

    /// Rounds completed so far.
    pub fn rounds_completed(&self) -> usize {
        lock(&self.state).round
    }

    /// Current run length. Equals the final run length once every round
    /// has completed.
    pub fn run_len(&self) -> usize {
        lock(&self.state).run_len
    }

    /// Size of the merged space.
    pub fn space_size(&self) -> usize {
        self.space_size
    }

    /// Run length entering the first round.
    pub fn initial_run(&self) -> usize {
        self.initial_run
    }
}
