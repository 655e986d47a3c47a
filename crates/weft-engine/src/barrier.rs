//! Phase barriers and the start gate.
//!
//! A [`PhaseBarrier`] blocks each arriving party until the configured
//! number of parties has arrived, then releases all of them together.
//! Barriers are reusable: the generation counter advances on every
//! release, so a fast party that re-enters before the slow ones have
//! woken cannot be confused with the previous generation.
//!
//! The arrival counts are part of the pipeline's correctness (the
//! driver is a party on some barriers and not on others), so each
//! barrier carries a name for log output.
//!
//! A barrier can be broken when a party panics. Every current and
//! future waiter then returns [`BarrierBroken`] instead of blocking on
//! an arrival that will never come.

use std::error::Error;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Lock `mutex`, recovering the guard if a panicking thread poisoned it.
///
/// Every mutex in this crate guards plain counters that are valid after
/// any partial update, and worker panics are reported through the join
/// handles, not through poisoning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returned by [`PhaseBarrier::arrive_and_wait`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrierWaitResult {
    is_leader: bool,
}

impl BarrierWaitResult {
    /// True for exactly one party per generation: the last to arrive.
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }
}

/// Returned by [`PhaseBarrier::arrive_and_wait`] once the barrier has
/// been broken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrierBroken {
    /// Name of the broken barrier.
    pub barrier: &'static str,
}

impl fmt::Display for BarrierBroken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "barrier {} broken by a panicking party", self.barrier)
    }
}

impl Error for BarrierBroken {}

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    broken: bool,
}

/// A reusable rendezvous point for a fixed number of parties.
#[derive(Debug)]
pub struct PhaseBarrier {
    name: &'static str,
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl PhaseBarrier {
    /// Create a barrier that releases once `parties` threads have arrived.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is zero.
    pub fn new(name: &'static str, parties: usize) -> Self {
        assert!(parties > 0, "barrier {name} needs at least one party");
        Self {
            name,
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                broken: false,
            }),
            released: Condvar::new(),
        }
    }

    /// Block until all parties of the current generation have arrived.
    pub fn arrive_and_wait(&self) -> Result<BarrierWaitResult, BarrierBroken> {
        let mut state = lock(&self.state);
        if state.broken {
            return Err(self.broken_error());
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            drop(state);
            self.released.notify_all();
            log::trace!("barrier {} released {} parties", self.name, self.parties);
            return Ok(BarrierWaitResult { is_leader: true });
        }
        while state.generation == generation && !state.broken {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.generation == generation {
            return Err(self.broken_error());
        }
        Ok(BarrierWaitResult { is_leader: false })
    }

    /// Release every waiter with [`BarrierBroken`] and fail all later
    /// arrivals.
    pub fn break_barrier(&self) {
        let mut state = lock(&self.state);
        if !state.broken {
            state.broken = true;
            drop(state);
            self.released.notify_all();
            log::debug!("barrier {} broken", self.name);
        }
    }

    /// Whether [`break_barrier`](Self::break_barrier) has been called.
    pub fn is_broken(&self) -> bool {
        lock(&self.state).broken
    }

    fn broken_error(&self) -> BarrierBroken {
        BarrierBroken { barrier: self.name }
    }

    /// Barrier name used in log output.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of parties per generation.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Completed generations so far.
    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }
}

// ── StartGate ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Aborted,
}

/// One-shot gate holding spawned workers until the whole team exists.
///
/// The driver opens the gate once every thread has been spawned, or
/// aborts it if a spawn fails so that the workers already running can
/// exit without entering any phase.
#[derive(Debug)]
pub struct StartGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StartGate {
    /// A closed gate.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Closed),
            changed: Condvar::new(),
        }
    }

    /// Block until the gate is opened (`true`) or aborted (`false`).
    pub fn wait(&self) -> bool {
        let mut state = lock(&self.state);
        while *state == GateState::Closed {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *state == GateState::Open
    }

    /// Release waiting workers into the pipeline.
    pub fn open(&self) {
        self.settle(GateState::Open);
    }

    /// Release waiting workers with the instruction to exit.
    pub fn abort(&self) {
        self.settle(GateState::Aborted);
    }

    fn settle(&self, to: GateState) {
        let mut state = lock(&self.state);
        if *state == GateState::Closed {
            *state = to;
            drop(state);
            self.changed.notify_all();
        }
    }
}

impl Default for StartGate {
    fn default() -> Self {
        Self::new()
    }
}
