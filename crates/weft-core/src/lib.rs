//! Core types and traits for the Weft phased parallel pipeline.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace: index
//! ranges, phase and worker identifiers, scheduling policies, the
//! elementwise kernel contract, and the run-level error type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod kernel;
pub mod policy;
pub mod range;

pub use error::RunError;
pub use id::{PhaseId, WorkerId};
pub use kernel::StageKernels;
pub use policy::SchedulePolicy;
pub use range::IndexRange;
