//! Run-level error type for the Weft pipeline.
//!
//! Every failure in a pipeline run propagates to the driver, which
//! terminates the run with one of these rather than producing a silently
//! wrong scalar. Nothing here is retried: the dataset is deterministic
//! from its seed, so a retry reproduces the same failure.

use std::error::Error;
use std::fmt;

/// Errors that terminate a pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunError {
    /// The sorted B buffer holds no element greater than zero, so the
    /// reduce phase has no divisor. Data-dependent, not an engine defect.
    NoPositiveElement {
        /// Length of the buffer that was searched.
        searched: usize,
    },
    /// A buffer could not be allocated. Raised before any worker starts.
    AllocationFailed {
        /// Which buffer failed.
        buffer: &'static str,
        /// Number of `f64` elements requested.
        requested: usize,
    },
    /// A worker or observer thread could not be spawned. Raised before
    /// any phase runs; already-spawned workers are released unused.
    ThreadSpawnFailed {
        /// Description of which thread failed and why.
        reason: String,
    },
    /// A worker thread panicked.
    WorkerPanicked {
        /// The worker that panicked.
        worker: u32,
    },
    /// The run configuration was rejected.
    Config(String),
}

impl RunError {
    /// Exit status for the degenerate-data failure.
    pub const EXIT_NO_POSITIVE: i32 = 2;
    /// Exit status for allocation failure.
    pub const EXIT_ALLOCATION: i32 = 3;
    /// Exit status for thread spawn failure.
    pub const EXIT_THREAD_SPAWN: i32 = 4;
    /// Exit status for a panicked worker.
    pub const EXIT_WORKER_PANIC: i32 = 5;
    /// Exit status for a rejected configuration (`EX_USAGE`).
    pub const EXIT_CONFIG: i32 = 64;

    /// Distinct non-zero process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoPositiveElement { .. } => Self::EXIT_NO_POSITIVE,
            Self::AllocationFailed { .. } => Self::EXIT_ALLOCATION,
            Self::ThreadSpawnFailed { .. } => Self::EXIT_THREAD_SPAWN,
            Self::WorkerPanicked { .. } => Self::EXIT_WORKER_PANIC,
            Self::Config(_) => Self::EXIT_CONFIG,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPositiveElement { searched } => {
                write!(f, "no positive element in sorted buffer of {searched} elements")
            }
            Self::AllocationFailed { buffer, requested } => {
                write!(f, "failed to allocate buffer {buffer} ({requested} elements)")
            }
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
            Self::WorkerPanicked { worker } => write!(f, "worker {worker} panicked"),
            Self::Config(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl Error for RunError {}
