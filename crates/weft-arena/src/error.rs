//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use weft_core::RunError;

/// Errors that can occur while setting up run buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The allocator refused a buffer of the requested size.
    AllocationFailed {
        /// Which buffer failed (`"a"`, `"b"` or `"scratch"`).
        buffer: &'static str,
        /// Number of `f64` elements requested.
        requested: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { buffer, requested } => {
                write!(
                    f,
                    "allocation failed for buffer {buffer}: requested {requested} elements"
                )
            }
        }
    }
}

impl Error for ArenaError {}

impl From<ArenaError> for RunError {
    fn from(e: ArenaError) -> Self {
        match e {
            ArenaError::AllocationFailed { buffer, requested } => {
                RunError::AllocationFailed { buffer, requested }
            }
        }
    }
}
