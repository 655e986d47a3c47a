//! The buffer set owned by one pipeline run.

use crate::error::ArenaError;
use crate::shared::SharedBuffer;

/// Buffers A, B and scratch for a run over a problem of size `N`.
///
/// A holds `N` elements; B and scratch hold `N / 2`. All three are
/// allocated up front so that resource exhaustion is reported before any
/// worker starts, and dropped together when the run ends.
#[derive(Debug)]
pub struct PipelineBuffers {
    /// Buffer A (`N` elements).
    pub a: SharedBuffer,
    /// Buffer B (`N / 2` elements).
    pub b: SharedBuffer,
    /// Scratch buffer (`N / 2` elements), owned by the copy and merge stages.
    pub scratch: SharedBuffer,
}

impl PipelineBuffers {
    /// Allocate zero-filled buffers for a problem of size `problem_size`.
    pub fn allocate(problem_size: usize) -> Result<Self, ArenaError> {
        let half = problem_size / 2;
        Ok(Self {
            a: SharedBuffer::zeroed("a", problem_size)?,
            b: SharedBuffer::zeroed("b", half)?,
            scratch: SharedBuffer::zeroed("scratch", half)?,
        })
    }

    /// Size of buffer A.
    pub fn a_len(&self) -> usize {
        self.a.len()
    }

    /// Size of buffers B and scratch.
    pub fn b_len(&self) -> usize {
        self.b.len()
    }

    /// Total memory held by the three buffers, in bytes.
    pub fn memory_bytes(&self) -> usize {
        (self.a.len() + self.b.len() + self.scratch.len()) * std::mem::size_of::<f64>()
    }
}
