//! Run configuration, validation, and error types.
//!
//! [`PipelineConfig`] is the input to [`PipelineDriver::new`](crate::PipelineDriver::new).
//! [`validate()`](PipelineConfig::validate) checks every value before
//! any buffer is allocated or thread spawned.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use weft_core::{RunError, SchedulePolicy};

/// Upper bound on the worker team size.
pub const MAX_WORKERS: usize = 256;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`PipelineConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Problem size gives an empty B buffer (`N / 2 == 0`).
    ProblemTooSmall {
        /// The configured problem size.
        problem_size: usize,
    },
    /// Worker count is zero or above [`MAX_WORKERS`].
    InvalidWorkerCount {
        /// The configured count.
        workers: usize,
    },
    /// Scheduler chunk size is zero.
    ZeroChunkSize,
    /// Initial sorted run length is zero.
    ZeroInitialRun,
    /// Progress reporting interval is zero.
    ZeroProgressInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProblemTooSmall { problem_size } => {
                write!(f, "problem_size {problem_size} is below minimum of 2")
            }
            Self::InvalidWorkerCount { workers } => {
                write!(f, "workers {workers} outside [1, {MAX_WORKERS}]")
            }
            Self::ZeroChunkSize => write!(f, "chunk_size must be at least 1"),
            Self::ZeroInitialRun => write!(f, "initial_run must be at least 1"),
            Self::ZeroProgressInterval => write!(f, "progress_interval must be non-zero"),
        }
    }
}

impl Error for ConfigError {}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Config(e.to_string())
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────

/// Complete configuration for one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Problem size `N`: length of buffer A. B and scratch hold `N / 2`.
    pub problem_size: usize,
    /// Worker team size. `None` = `available_parallelism`, clamped to
    /// `[1, MAX_WORKERS]`.
    pub workers: Option<usize>,
    /// Range scheduling policy applied to every phase.
    pub policy: SchedulePolicy,
    /// Scheduler chunk size (minimum chunk for the guided policy).
    pub chunk_size: usize,
    /// Length of the independently sorted runs that seed the merge rounds.
    /// Default: 64.
    pub initial_run: usize,
    /// How often the progress observer reports while idle. Default: 1s.
    pub progress_interval: Duration,
}

impl PipelineConfig {
    /// Default scheduler chunk size.
    pub const DEFAULT_CHUNK_SIZE: usize = 64;
    /// Default initial sorted run length.
    pub const DEFAULT_INITIAL_RUN: usize = 64;

    /// Config for a problem of size `problem_size` with defaults elsewhere.
    pub fn new(problem_size: usize) -> Self {
        Self {
            problem_size,
            ..Self::default()
        }
    }

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the scheduling policy.
    pub fn with_policy(mut self, policy: SchedulePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the scheduler chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the initial sorted run length.
    pub fn with_initial_run(mut self, initial_run: usize) -> Self {
        self.initial_run = initial_run;
        self
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.problem_size / 2 == 0 {
            return Err(ConfigError::ProblemTooSmall {
                problem_size: self.problem_size,
            });
        }
        if let Some(workers) = self.workers {
            if workers == 0 || workers > MAX_WORKERS {
                return Err(ConfigError::InvalidWorkerCount { workers });
            }
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.initial_run == 0 {
            return Err(ConfigError::ZeroInitialRun);
        }
        if self.progress_interval.is_zero() {
            return Err(ConfigError::ZeroProgressInterval);
        }
        Ok(())
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    pub fn resolved_workers(&self) -> usize {
        match self.workers {
            Some(n) => n.clamp(1, MAX_WORKERS),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, MAX_WORKERS),
        }
    }

    /// Length of buffers B and scratch.
    pub fn half_size(&self) -> usize {
        self.problem_size / 2
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            problem_size: 1000,
            workers: None,
            policy: SchedulePolicy::Static,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            initial_run: Self::DEFAULT_INITIAL_RUN,
            progress_interval: Duration::from_secs(1),
        }
    }
}
