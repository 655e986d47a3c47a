//! Lock-free shared buffers and the exclusive slice handle.
//!
//! [`SharedBuffer`] is a fixed-length `f64` buffer that every worker of a
//! run can reach through a shared reference. Nothing at runtime stops two
//! workers from touching the same element; disjointness is the caller's
//! contract, discharged by the range scheduler (no two live claims in one
//! phase overlap) and the phase barriers (no claim outlives its phase).
//!
//! Every accessor that hands out element references is `unsafe` and
//! carries that contract in its `# Safety` section.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::fmt;

use weft_core::IndexRange;

use crate::error::ArenaError;

/// A fixed-length `f64` buffer shared across a worker team.
pub struct SharedBuffer {
    name: &'static str,
    cells: Box<[UnsafeCell<f64>]>,
}

// SAFETY: `UnsafeCell<f64>` is `Send`; the buffer owns its cells outright.
unsafe impl Send for SharedBuffer {}
// SAFETY: shared access only hands out element references through the
// `unsafe` accessors below, whose callers guarantee that no mutable range
// overlaps any other live range. Under that contract concurrent use from
// several threads touches disjoint memory and is race-free.
unsafe impl Sync for SharedBuffer {}

// Compile-time assertion: SharedBuffer must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SharedBuffer>();
};

impl SharedBuffer {
    /// Allocate a zero-filled buffer of `len` elements.
    ///
    /// Uses fallible reservation so that an oversized request surfaces as
    /// [`ArenaError::AllocationFailed`] instead of aborting the process.
    pub fn zeroed(name: &'static str, len: usize) -> Result<Self, ArenaError> {
        let mut cells: Vec<UnsafeCell<f64>> = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| ArenaError::AllocationFailed {
                buffer: name,
                requested: len,
            })?;
        cells.extend((0..len).map(|_| UnsafeCell::new(0.0)));
        Ok(Self {
            name,
            cells: cells.into_boxed_slice(),
        })
    }

    /// Build a buffer from existing values.
    pub fn from_vec(name: &'static str, values: Vec<f64>) -> Self {
        Self {
            name,
            cells: values.into_iter().map(UnsafeCell::new).collect(),
        }
    }

    /// Diagnostic name of the buffer.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the buffer has zero elements.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The whole buffer as one range.
    pub fn full_range(&self) -> IndexRange {
        IndexRange::new(0, self.len())
    }

    /// Mutable handle over `range`.
    ///
    /// # Safety
    ///
    /// For as long as the returned handle lives, no other handle or view
    /// overlapping `range` may exist on this buffer, on any thread.
    pub unsafe fn exclusive(&self, range: IndexRange) -> ExclusiveSlice<'_> {
        self.check_bounds(range);
        let r = range.as_range();
        let data: &mut [f64] = if r.is_empty() {
            &mut []
        } else {
            // SAFETY: `r` lies inside the allocation (checked above) and
            // `UnsafeCell<f64>` has the same layout as `f64`. Exclusivity
            // of the range is the caller's contract.
            unsafe {
                let base = UnsafeCell::raw_get(self.cells.as_ptr().add(r.start));
                std::slice::from_raw_parts_mut(base, r.len())
            }
        };
        ExclusiveSlice {
            offset: r.start,
            data,
        }
    }

    /// Read-only view over `range`.
    ///
    /// # Safety
    ///
    /// For as long as the returned slice lives, no mutable handle
    /// overlapping `range` may exist on this buffer, on any thread.
    pub unsafe fn view(&self, range: IndexRange) -> &[f64] {
        self.check_bounds(range);
        let r = range.as_range();
        if r.is_empty() {
            return &[];
        }
        // SAFETY: in bounds and layout-compatible as above; the caller
        // guarantees no concurrent writer over `range`.
        unsafe {
            let base = UnsafeCell::raw_get(self.cells.as_ptr().add(r.start));
            std::slice::from_raw_parts(base, r.len())
        }
    }

    /// Whole-buffer mutable access through an exclusive borrow.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        let len = self.cells.len();
        // SAFETY: `&mut self` rules out any other live handle or view.
        unsafe { std::slice::from_raw_parts_mut(UnsafeCell::raw_get(self.cells.as_ptr()), len) }
    }

    /// Consume the buffer and return its values.
    pub fn into_vec(self) -> Vec<f64> {
        self.cells
            .into_vec()
            .into_iter()
            .map(UnsafeCell::into_inner)
            .collect()
    }

    fn check_bounds(&self, range: IndexRange) {
        assert!(
            range.is_empty() || range.end <= self.len(),
            "range {range} outside buffer {} of {} elements",
            self.name,
            self.len()
        );
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

/// Exclusive mutable access to one claimed range of a [`SharedBuffer`].
///
/// Indexing is by *global* buffer index so that phase kernels that depend
/// on position (generation, neighbour reads) never have to translate.
pub struct ExclusiveSlice<'a> {
    offset: usize,
    data: &'a mut [f64],
}

impl<'a> ExclusiveSlice<'a> {
    /// Wrap an already-exclusive slice that starts at global `offset`.
    pub fn from_slice(offset: usize, data: &'a mut [f64]) -> Self {
        Self { offset, data }
    }

    /// The global range covered.
    pub fn range(&self) -> IndexRange {
        IndexRange::new(self.offset, self.offset + self.data.len())
    }

    /// Number of elements covered.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the handle covers nothing.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at global `index`, if covered.
    pub fn get(&self, index: usize) -> Option<f64> {
        index
            .checked_sub(self.offset)
            .and_then(|i| self.data.get(i))
            .copied()
    }

    /// Local slice view.
    pub fn as_slice(&self) -> &[f64] {
        self.data
    }

    /// Local mutable slice view.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data
    }

    /// `(global_index, &mut value)` pairs in ascending index order.
    pub fn indexed_mut(&mut self) -> impl Iterator<Item = (usize, &mut f64)> + '_ {
        let offset = self.offset;
        self.data
            .iter_mut()
            .enumerate()
            .map(move |(i, v)| (offset + i, v))
    }

    /// Split into consecutive handles of at most `width` elements each,
    /// aligned to multiples of `width` in global index space.
    pub fn chunks_aligned(self, width: usize) -> Vec<ExclusiveSlice<'a>> {
        assert!(width > 0, "chunk width must be positive");
        let mut out = Vec::new();
        let mut offset = self.offset;
        let mut rest = self.data;
        while !rest.is_empty() {
            let to_boundary = width - (offset % width);
            let take = to_boundary.min(rest.len());
            let (head, tail) = rest.split_at_mut(take);
            out.push(ExclusiveSlice { offset, data: head });
            offset += take;
            rest = tail;
        }
        out
    }
}

impl fmt::Debug for ExclusiveSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveSlice")
            .field("range", &self.range())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_is_all_zero() {
        let buf = SharedBuffer::zeroed("t", 16).unwrap();
        assert_eq!(buf.len(), 16);
        assert!(buf.into_vec().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn exclusive_borrow_writes_whole_buffer() {
        let mut buf = SharedBuffer::zeroed("t", 4).unwrap();
        buf.as_mut_slice().copy_from_slice(&[4.0, 3.0, 2.0, 1.0]);
        assert_eq!(buf.into_vec(), [4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn oversized_allocation_is_reported() {
        let err = SharedBuffer::zeroed("huge", usize::MAX / 2).unwrap_err();
        assert_eq!(
            err,
            ArenaError::AllocationFailed {
                buffer: "huge",
                requested: usize::MAX / 2
            }
        );
    }

    #[test]
    fn disjoint_handles_write_through() {
        let buf = SharedBuffer::zeroed("t", 10).unwrap();
        // SAFETY: the two ranges are disjoint and no other handle exists.
        let (mut left, mut right) = unsafe {
            (
                buf.exclusive(IndexRange::new(0, 4)),
                buf.exclusive(IndexRange::new(4, 10)),
            )
        };
        for (i, v) in left.indexed_mut() {
            *v = i as f64;
        }
        for (i, v) in right.indexed_mut() {
            *v = 100.0 + i as f64;
        }
        assert_eq!(right.get(4), Some(104.0));
        assert_eq!(right.get(3), None);
        let values = buf.into_vec();
        assert_eq!(values[3], 3.0);
        assert_eq!(values[9], 109.0);
    }

    #[test]
    fn parallel_disjoint_writes() {
        let buf = SharedBuffer::zeroed("t", 1000).unwrap();
        std::thread::scope(|s| {
            for w in 0..4usize {
                let buf = &buf;
                s.spawn(move || {
                    let range = IndexRange::new(w * 250, (w + 1) * 250);
                    // SAFETY: each thread owns a distinct quarter.
                    let mut slice = unsafe { buf.exclusive(range) };
                    for (i, v) in slice.indexed_mut() {
                        *v = i as f64;
                    }
                });
            }
        });
        let values = buf.into_vec();
        assert!(values.iter().enumerate().all(|(i, &v)| v == i as f64));
    }

    #[test]
    fn empty_range_is_valid_anywhere_in_bounds() {
        let buf = SharedBuffer::zeroed("t", 4).unwrap();
        // SAFETY: empty handles alias nothing.
        let h = unsafe { buf.exclusive(IndexRange::empty(4)) };
        assert!(h.is_empty());
        assert_eq!(h.range(), IndexRange::new(4, 4));
    }

    #[test]
    #[should_panic(expected = "outside buffer")]
    fn out_of_bounds_claim_panics() {
        let buf = SharedBuffer::zeroed("t", 4).unwrap();
        // SAFETY: never reached; the bounds check panics first.
        let _ = unsafe { buf.view(IndexRange::new(2, 8)) };
    }

    #[test]
    fn chunks_aligned_respects_global_boundaries() {
        let mut data = vec![0.0; 10];
        let slice = ExclusiveSlice::from_slice(6, &mut data);
        let ranges: Vec<_> = slice.chunks_aligned(4).iter().map(|c| c.range()).collect();
        assert_eq!(
            ranges,
            vec![
                IndexRange::new(6, 8),
                IndexRange::new(8, 12),
                IndexRange::new(12, 16)
            ]
        );
    }
}
