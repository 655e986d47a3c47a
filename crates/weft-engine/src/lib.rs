//! Fixed-team phased parallel execution engine.
//!
//! A [`PipelineDriver`] runs one pass of the fixed stage sequence over
//! shared buffers with a team of worker threads created for that run:
//!
//! ```text
//! Driver                  Workers (K)                       Observer
//!   |  allocate buffers       |                                 |
//!   |  spawn team ----------->| gate.wait()                     |
//!   |  gate.open()            | generate-a, generate-b          |
//!   |--generate barrier-------|---------------------------------|--> 10%
//!   |                         | map-a, map-b-copy               |
//!   |                         |   (copy barrier, workers only)  |
//!   |                         | map-b-combine                   |
//!   |--map barrier------------|---------------------------------|--> 30%
//!   |                         | merge                           |
//!   |--merge barrier----------|---------------------------------|--> 40%
//!   |                         | chunk-sort                      |
//!   |                         |   (sort-entry barrier, workers) |
//!   |                         | iterative merge rounds          |
//!   |                         |   (MergeCoordinator)            |
//!   |--sort barrier-----------|---------------------------------|--> 90%
//!   |                         | reduce                          |
//!   |--reduce barrier---------|---------------------------------|--> 100%
//!   |  join, sum partials     |                                 |
//! ```
//!
//! Within a phase every worker pulls ranges from that phase's
//! [`RangeScheduler`] until it is exhausted; the scheduler's partition
//! guarantee is what makes the lock-free buffer access sound.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod barrier;
pub mod config;
pub mod driver;
pub mod merge;
pub mod metrics;
pub mod progress;
pub mod scheduler;
mod stage;
mod worker;

pub use barrier::{BarrierBroken, BarrierWaitResult, PhaseBarrier, StartGate};
pub use config::{ConfigError, PipelineConfig};
pub use driver::{PipelineDriver, RunReport};
pub use merge::{MergeCoordinator, RoundOutcome, RoundPlan};
pub use metrics::PhaseTimings;
pub use progress::{ProgressEvent, ProgressObserver};
pub use scheduler::{Claims, PhaseSchedulers, RangeScheduler, WorkerSlot};
