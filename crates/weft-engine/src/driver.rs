//! The coordinating thread of a pipeline run.
//!
//! [`PipelineDriver::run`] allocates the run's buffers, spawns the
//! progress observer and the worker team inside a thread scope, walks
//! the driver-observed barriers while recording timings, then joins the
//! team and sums the workers' partial results.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use weft_arena::PipelineBuffers;
use weft_core::{RunError, SchedulePolicy, StageKernels, WorkerId};

use crate::barrier::StartGate;
use crate::config::{ConfigError, PipelineConfig};
use crate::merge::MergeCoordinator;
use crate::metrics::PhaseTimings;
use crate::progress::{ProgressEvent, ProgressObserver};
use crate::scheduler::PhaseSchedulers;
use crate::stage::StageContext;
use crate::worker::{RunBarriers, RunShared, WorkerLoop};

/// Outcome of a successful run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Sum of every worker's partial reduce result.
    pub result: f64,
    /// Elapsed time per driver-observed barrier.
    pub timings: PhaseTimings,
    /// Merge rounds completed.
    pub merge_rounds: usize,
    /// Worker team size.
    pub workers: usize,
    /// Scheduling policy used for every phase.
    pub policy: SchedulePolicy,
    /// Last progress percentage seen by the observer.
    pub final_progress: u8,
}

/// Runs the fixed pipeline over kernels `K` with a fresh worker team per
/// run.
#[derive(Debug)]
pub struct PipelineDriver<K> {
    config: PipelineConfig,
    kernels: K,
    workers: usize,
}

impl<K: StageKernels> PipelineDriver<K> {
    /// Validate `config` and build a driver.
    pub fn new(config: PipelineConfig, kernels: K) -> Result<Self, ConfigError> {
        config.validate()?;
        let workers = config.resolved_workers();
        Ok(Self {
            config,
            kernels,
            workers,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The kernels applied by each phase.
    pub fn kernels(&self) -> &K {
        &self.kernels
    }

    /// Resolved worker team size.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Execute one complete pass of the pipeline.
    ///
    /// Buffers are allocated before any thread is spawned, so allocation
    /// failure leaves nothing to clean up. If any thread fails to spawn,
    /// the workers already running are released through the start gate
    /// without entering a phase.
    pub fn run(&self) -> Result<RunReport, RunError> {
        let cfg = &self.config;
        let started = Instant::now();
        let buffers = PipelineBuffers::allocate(cfg.problem_size)?;
        let half = buffers.b_len();
        let shared = RunShared {
            stage: StageContext::new(&buffers, &self.kernels, cfg.initial_run),
            schedulers: PhaseSchedulers::for_problem(
                cfg.problem_size,
                cfg.initial_run,
                cfg.policy,
                cfg.chunk_size,
                self.workers,
            ),
            merge: MergeCoordinator::new(
                half,
                cfg.initial_run,
                cfg.policy,
                cfg.chunk_size,
                self.workers,
            ),
            barriers: RunBarriers::new(self.workers),
            gate: StartGate::new(),
        };
        log::info!(
            "pipeline start: n={} workers={} policy={} chunk={} ({} bytes of buffers)",
            cfg.problem_size,
            self.workers,
            cfg.policy,
            cfg.chunk_size,
            buffers.memory_bytes()
        );

        let (result, timings, final_progress) = thread::scope(|scope| -> Result<_, RunError> {
            let (tx, rx) = crossbeam_channel::unbounded();
            let interval = cfg.progress_interval;
            let observer = thread::Builder::new()
                .name("weft-progress".into())
                .spawn_scoped(scope, move || ProgressObserver::new(rx, interval).run())
                .map_err(spawn_failed)?;

            let mut team = Vec::with_capacity(self.workers);
            for w in 0..self.workers {
                let worker = WorkerLoop::new(WorkerId(w as u32), &shared);
                let spawned = thread::Builder::new()
                    .name(format!("weft-worker-{w}"))
                    .spawn_scoped(scope, move || worker.run());
                match spawned {
                    Ok(handle) => team.push(handle),
                    Err(e) => {
                        log::error!("failed to spawn worker {w}: {e}");
                        shared.gate.abort();
                        return Err(spawn_failed(e));
                    }
                }
            }
            shared.gate.open();

            let timings = drive_barriers(&shared.barriers, &tx);
            drop(tx);

            let mut panicked = None;
            let mut result: Result<f64, RunError> = Ok(0.0);
            for (w, handle) in team.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(partial)) => {
                        if let Ok(sum) = &mut result {
                            *sum += partial;
                        }
                    }
                    Ok(Err(e)) => {
                        if result.is_ok() {
                            result = Err(e);
                        }
                    }
                    Err(_) => {
                        panicked.get_or_insert(w as u32);
                    }
                }
            }
            let final_progress = observer.join().unwrap_or_else(|_| {
                log::warn!("progress observer panicked");
                0
            });
            if let Some(worker) = panicked {
                return Err(RunError::WorkerPanicked { worker });
            }
            Ok((result?, timings, final_progress))
        })
        .inspect_err(|e| log::error!("pipeline failed: {e}"))?;

        log::info!(
            "pipeline done: result={result} merge_rounds={} in {:?}",
            shared.merge.rounds_completed(),
            started.elapsed()
        );
        Ok(RunReport {
            result,
            timings,
            merge_rounds: shared.merge.rounds_completed(),
            workers: self.workers,
            policy: cfg.policy,
            final_progress,
        })
    }
}

/// Wait on every driver-observed barrier in turn, timing the interval
/// before each and reporting it to the observer. Stops early if a
/// barrier is broken.
fn drive_barriers(barriers: &RunBarriers, progress: &Sender<ProgressEvent>) -> PhaseTimings {
    let mut timings = PhaseTimings::new();
    let mut mark = Instant::now();
    for (barrier, percent) in barriers.driver_observed() {
        if let Err(e) = barrier.arrive_and_wait() {
            log::warn!("{e}");
            break;
        }
        let now = Instant::now();
        let elapsed: Duration = now - mark;
        mark = now;
        timings.record(barrier.name(), elapsed);
        log::debug!("{} barrier passed after {elapsed:?}", barrier.name());
        let event = ProgressEvent {
            label: barrier.name(),
            percent,
        };
        if progress.send(event).is_err() {
            log::warn!("progress observer gone before {} barrier", barrier.name());
        }
    }
    timings
}

fn spawn_failed(e: std::io::Error) -> RunError {
    RunError::ThreadSpawnFailed {
        reason: e.to_string(),
    }
}
