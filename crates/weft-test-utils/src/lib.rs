//! Test fixtures and coverage helpers for Weft development.
//!
//! Provides fixture [`StageKernels`](weft_core::StageKernels)
//! implementations for driving the engine into specific situations, and
//! helpers that drain a [`RangeScheduler`](weft_engine::RangeScheduler)
//! and check that the claims partition its space.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod coverage;
pub mod fixtures;

pub use coverage::{assert_partition, drain_concurrently, drain_sequentially};
pub use fixtures::{PanickingKernels, ScrambledKernels, ZeroKernels};
