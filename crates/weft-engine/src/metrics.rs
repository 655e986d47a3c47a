//! Per-run timing metrics.
//!
//! [`PhaseTimings`] records the elapsed time between consecutive
//! driver-observed barriers, keyed by barrier name in the order the
//! barriers were passed.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;

/// Elapsed time per driver-observed barrier, in pass order.
#[derive(Clone, Debug, Default)]
pub struct PhaseTimings {
    phases: IndexMap<&'static str, Duration>,
    total: Duration,
}

impl PhaseTimings {
    /// Empty timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `elapsed` against `barrier`. Re-recording a barrier adds to
    /// its existing entry.
    pub fn record(&mut self, barrier: &'static str, elapsed: Duration) {
        *self.phases.entry(barrier).or_default() += elapsed;
        self.total += elapsed;
    }

    /// Elapsed time recorded for `barrier`.
    pub fn get(&self, barrier: &str) -> Option<Duration> {
        self.phases.get(barrier).copied()
    }

    /// `(barrier, elapsed)` pairs in the order first recorded.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.phases.iter().map(|(&name, &d)| (name, d))
    }

    /// Number of barriers recorded.
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Sum of all recorded durations.
    pub fn total(&self) -> Duration {
        self.total
    }
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, elapsed) in self.iter() {
            writeln!(f, "{name:>10}: {:>10.3} ms", elapsed.as_secs_f64() * 1e3)?;
        }
        write!(f, "{:>10}: {:>10.3} ms", "total", self.total.as_secs_f64() * 1e3)
    }
}
