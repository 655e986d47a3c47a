//! Benchmark profiles for the Weft pipeline engine.
//!
//! - [`reference_profile`]: the seed-47 workload at N = 1000
//! - [`stress_profile`]: the same kernels at N = 2^20
//! - [`PROFILE_SEED`]: seed shared by every profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use weft_core::SchedulePolicy;
use weft_engine::PipelineConfig;
use weft_kernels::ReferenceKernels;

/// Seed used by every benchmark profile.
pub const PROFILE_SEED: u64 = 47;

/// Small reference run: N = 1000, chunk 64.
pub fn reference_profile(workers: usize, policy: SchedulePolicy) -> (PipelineConfig, ReferenceKernels) {
    let config = PipelineConfig::new(1000)
        .with_workers(workers)
        .with_policy(policy)
        .with_chunk_size(64);
    (config, ReferenceKernels::new(PROFILE_SEED))
}

/// Large run for throughput measurement: N = 2^20, chunk 4096.
pub fn stress_profile(workers: usize, policy: SchedulePolicy) -> (PipelineConfig, ReferenceKernels) {
    let config = PipelineConfig::new(1 << 20)
        .with_workers(workers)
        .with_policy(policy)
        .with_chunk_size(4096);
    (config, ReferenceKernels::new(PROFILE_SEED))
}
