//! Work-distribution policies for the range scheduler.

use std::fmt;
use std::str::FromStr;

/// How a scheduler sizes and assigns index ranges to workers.
///
/// All three policies hand out every index of the space exactly once;
/// they differ only in how the space is cut and who gets which piece.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SchedulePolicy {
    /// Precomputed round-robin interleaving of fixed chunks. No shared
    /// state; worker `w`'s `j`-th claim starts at `(j * K + w) * chunk`.
    #[default]
    Static,
    /// A shared cursor advanced by one fixed chunk per claim.
    Dynamic,
    /// A shared cursor advanced by `max(chunk, remaining / K)` per claim.
    Guided,
}

impl SchedulePolicy {
    /// Every policy, for exhaustive tests and benchmarks.
    pub const ALL: [SchedulePolicy; 3] = [Self::Static, Self::Dynamic, Self::Guided];

    /// Lowercase name of the policy.
    pub fn name(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Guided => "guided",
        }
    }

    /// Whether claims go through a shared, lock-guarded cursor.
    pub fn uses_shared_cursor(self) -> bool {
        !matches!(self, Self::Static)
    }
}

impl fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing a [`SchedulePolicy`] from a string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownPolicy(pub String);

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown scheduling policy '{}' (expected static, dynamic or guided)",
            self.0
        )
    }
}

impl std::error::Error for UnknownPolicy {}

impl FromStr for SchedulePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            "guided" => Ok(Self::Guided),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}
