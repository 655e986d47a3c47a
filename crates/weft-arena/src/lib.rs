//! Shared numeric buffers for Weft pipeline runs.
//!
//! A pipeline run owns three `f64` buffers for its whole duration:
//!
//! ```text
//! PipelineBuffers
//! ├── a        N elements      (generate-A, map-A, read by merge)
//! ├── b        N / 2 elements  (generate-B … reduce)
//! └── scratch  N / 2 elements  (neighbour copy, merge-round target)
//! ```
//!
//! Buffers are shared by every worker without a lock. Each worker only
//! touches the range the scheduler handed it, so element access goes
//! through [`ExclusiveSlice`] handles created by `unsafe` accessors on
//! [`SharedBuffer`]. This crate is one of two that may contain `unsafe`
//! code (along with the stage module of `weft-engine`); it is confined
//! to `shared.rs`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod buffers;
pub mod error;
pub mod shared;

pub use buffers::PipelineBuffers;
pub use error::ArenaError;
pub use shared::{ExclusiveSlice, SharedBuffer};
