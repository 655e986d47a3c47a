//! Reference elementwise kernels for the Weft pipeline.
//!
//! [`ReferenceKernels`] implements [`StageKernels`](weft_core::StageKernels)
//! with the benchmark workload: index-seeded uniform generation, a square
//! root map on A, an absolute-tangent neighbour combine on B, an
//! elementwise product, and a parity-gated sine reduction.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod generate;
pub mod reference;

pub use generate::IndexSeededUniform;
pub use reference::{ReferenceKernels, AMPLITUDE};
