//! Weft: a fixed-team phased parallel pipeline engine.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Weft sub-crates. For most users, adding `weft` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use weft::prelude::*;
//!
//! let config = PipelineConfig::new(1000)
//!     .with_workers(4)
//!     .with_policy(SchedulePolicy::Dynamic);
//! let driver = PipelineDriver::new(config, ReferenceKernels::new(47)).unwrap();
//! let report = driver.run().unwrap();
//! assert!(report.result.is_finite());
//! assert_eq!(report.timings.len(), 5);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `weft-core` | Ranges, IDs, policies, the kernel trait, `RunError` |
//! | [`arena`] | `weft-arena` | Shared buffers and exclusive slice handles |
//! | [`kernels`] | `weft-kernels` | Reference elementwise kernels |
//! | [`engine`] | `weft-engine` | Schedulers, barriers, merge coordination, the driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and the kernel contract (`weft-core`).
pub use weft_core as types;

/// Shared numeric buffers (`weft-arena`).
pub use weft_arena as arena;

/// Reference kernels (`weft-kernels`).
///
/// [`kernels::ReferenceKernels`] is the seeded benchmark workload.
pub use weft_kernels as kernels;

/// The execution engine (`weft-engine`).
///
/// [`engine::PipelineDriver`] runs one pass of the pipeline;
/// [`engine::RangeScheduler`] and [`engine::MergeCoordinator`] are usable
/// on their own.
pub use weft_engine as engine;

/// Common imports for typical Weft usage.
///
/// ```rust
/// use weft::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use weft_core::{IndexRange, PhaseId, RunError, SchedulePolicy, StageKernels, WorkerId};

    // Kernels
    pub use weft_kernels::ReferenceKernels;

    // Engine
    pub use weft_engine::{
        ConfigError, PhaseTimings, PipelineConfig, PipelineDriver, RangeScheduler, RunReport,
        WorkerSlot,
    };
}
