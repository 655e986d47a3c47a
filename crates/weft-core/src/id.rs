//! Strongly-typed identifiers for pipeline phases and workers.

use std::fmt;

/// Identifies a worker thread within a pipeline run.
///
/// Workers are numbered `0..worker_count` at spawn time. The identity
/// is stable for the lifetime of the run and drives the static
/// scheduling policy's interleaving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u32);

impl WorkerId {
    /// The worker id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WorkerId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// One stage of the fixed pipeline sequence.
///
/// Workers walk these strictly forward in declaration order. The
/// discriminant doubles as the index into per-phase scheduler tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseId {
    /// Fill buffer A from the index-seeded generator.
    GenerateA = 0,
    /// Fill buffer B from the index-seeded generator.
    GenerateB = 1,
    /// Map buffer A in place.
    MapA = 2,
    /// Copy buffer B into scratch ahead of the neighbour combine.
    MapBCopy = 3,
    /// Combine each B element with its pre-combine left neighbour.
    MapBCombine = 4,
    /// Fold buffer A into buffer B elementwise.
    Merge = 5,
    /// Sort fixed-length runs of buffer B independently.
    ChunkSort = 6,
    /// Bottom-up merge of sorted runs until one run remains.
    IterativeMerge = 7,
    /// Reduce buffer B into per-worker partial sums.
    Reduce = 8,
}

impl PhaseId {
    /// Number of phases in the fixed sequence.
    pub const COUNT: usize = 9;

    /// Every phase, in execution order.
    pub const ALL: [PhaseId; Self::COUNT] = [
        PhaseId::GenerateA,
        PhaseId::GenerateB,
        PhaseId::MapA,
        PhaseId::MapBCopy,
        PhaseId::MapBCombine,
        PhaseId::Merge,
        PhaseId::ChunkSort,
        PhaseId::IterativeMerge,
        PhaseId::Reduce,
    ];

    /// Position of this phase in [`PhaseId::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The phase that follows this one, or `None` after [`PhaseId::Reduce`].
    pub fn next(self) -> Option<PhaseId> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Short kebab-case label used in logs and timing reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::GenerateA => "generate-a",
            Self::GenerateB => "generate-b",
            Self::MapA => "map-a",
            Self::MapBCopy => "map-b-copy",
            Self::MapBCombine => "map-b-combine",
            Self::Merge => "merge",
            Self::ChunkSort => "chunk-sort",
            Self::IterativeMerge => "iterative-merge",
            Self::Reduce => "reduce",
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
