//! Scheduler coverage helpers.

use weft_core::{IndexRange, WorkerId};
use weft_engine::{RangeScheduler, WorkerSlot};

/// Drain `scheduler` from one thread, rotating through its workers one
/// claim at a time. Returns every `(worker, range)` issued.
pub fn drain_sequentially(scheduler: &RangeScheduler) -> Vec<(WorkerId, IndexRange)> {
    let mut slots: Vec<WorkerSlot> = (0..scheduler.workers() as u32)
        .map(|w| WorkerSlot::new(WorkerId(w)))
        .collect();
    let mut live = vec![true; slots.len()];
    let mut out = Vec::new();
    while live.iter().any(|&l| l) {
        for (slot, live) in slots.iter_mut().zip(live.iter_mut()) {
            if !*live {
                continue;
            }
            let range = scheduler.next(slot);
            if range.is_empty() {
                *live = false;
            } else {
                out.push((slot.worker(), range));
            }
        }
    }
    out
}

/// Drain `scheduler` with one thread per worker.
pub fn drain_concurrently(scheduler: &RangeScheduler) -> Vec<(WorkerId, IndexRange)> {
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..scheduler.workers() as u32)
            .map(|w| {
                s.spawn(move || {
                    scheduler
                        .claims(WorkerId(w))
                        .map(|r| (WorkerId(w), r))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().expect("drain thread panicked"))
            .collect()
    })
}

/// Panic unless `ranges` cover `[0, space)` exactly once with no empty
/// ranges.
pub fn assert_partition(ranges: &[(WorkerId, IndexRange)], space: usize) {
    let mut sorted: Vec<IndexRange> = ranges.iter().map(|&(_, r)| r).collect();
    sorted.sort_by_key(|r| r.start);
    let mut expected = 0;
    for r in &sorted {
        assert!(!r.is_empty(), "empty range {r} issued");
        assert_eq!(r.start, expected, "gap or overlap at {r}");
        expected = r.end;
    }
    assert_eq!(expected, space, "claims stop short of the space");
}
