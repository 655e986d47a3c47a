//! Half-open index intervals handed out by the scheduler.

use std::fmt;
use std::ops::Range;

/// A half-open `[start, end)` interval over an array's index space.
///
/// An empty range (`start >= end`) is the scheduler's sentinel for "no
/// more work for this phase". Empty ranges keep their `start` so that a
/// caller can see where the cursor stood when the space ran out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    /// First index in the range.
    pub start: usize,
    /// One past the last index in the range.
    pub end: usize,
}

impl IndexRange {
    /// Create a range. `start` must not exceed `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "IndexRange start {start} > end {end}");
        Self { start, end }
    }

    /// The empty sentinel positioned at `at`.
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// A chunk of `len` indices starting at `start`, clipped to `space`.
    ///
    /// Returns the empty sentinel at `start` if `start >= space`.
    pub fn clipped(start: usize, len: usize, space: usize) -> Self {
        if start >= space {
            return Self::empty(start);
        }
        Self::new(start, start.saturating_add(len).min(space))
    }

    /// Whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Number of indices covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether `index` falls inside the range.
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Whether two non-empty ranges share at least one index.
    pub fn overlaps(&self, other: &IndexRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// Map a range of unit indices onto a range of elements, where unit
    /// `u` covers elements `[u * width, (u + 1) * width)`, clipped to `space`.
    ///
    /// Used to turn a claim over run or merge-pair indices into the
    /// element slice those units own.
    pub fn scaled(&self, width: usize, space: usize) -> IndexRange {
        let start = self.start.saturating_mul(width).min(space);
        let end = self.end.saturating_mul(width).min(space);
        IndexRange::new(start, end.max(start))
    }

    /// The range as a `std::ops::Range` for slicing and iteration.
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end.max(self.start)
    }
}

impl From<IndexRange> for Range<usize> {
    fn from(r: IndexRange) -> Self {
        r.as_range()
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
