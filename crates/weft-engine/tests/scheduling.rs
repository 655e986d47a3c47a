//! Partition property of every scheduling policy, across threads.

use proptest::prelude::*;
use weft_core::{PhaseId, SchedulePolicy};
use weft_engine::{PhaseSchedulers, RangeScheduler};
use weft_test_utils::{assert_partition, drain_concurrently, drain_sequentially};

#[test]
fn concurrent_claims_partition_every_phase() {
    for policy in SchedulePolicy::ALL {
        let phases = PhaseSchedulers::for_problem(10_000, 64, policy, 48, 8);
        for phase in PhaseId::ALL {
            let Some(scheduler) = phases.get(phase) else {
                assert_eq!(phase, PhaseId::IterativeMerge);
                continue;
            };
            let ranges = drain_concurrently(scheduler);
            assert_partition(&ranges, scheduler.space_size());
        }
    }
}

#[test]
fn static_claims_are_owned_by_the_interleaved_worker() {
    let s = RangeScheduler::new(SchedulePolicy::Static, 1000, 64, 4);
    for (worker, range) in drain_concurrently(&s) {
        assert_eq!((range.start / 64) % 4, worker.index());
    }
}

#[test]
fn guided_claims_never_drop_below_chunk_except_tail() {
    let s = RangeScheduler::new(SchedulePolicy::Guided, 10_000, 16, 4);
    let mut ranges = drain_concurrently(&s);
    ranges.sort_by_key(|(_, r)| r.start);
    let (tail, body) = ranges.split_last().unwrap();
    assert!(body.iter().all(|(_, r)| r.len() >= 16));
    assert!(tail.1.len() <= 16 || body.is_empty());
}

fn arb_policy() -> impl Strategy<Value = SchedulePolicy> {
    prop_oneof![
        Just(SchedulePolicy::Static),
        Just(SchedulePolicy::Dynamic),
        Just(SchedulePolicy::Guided),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn claims_partition_space(
        policy in arb_policy(),
        space in 0usize..20_000,
        chunk in 1usize..512,
        workers in 1usize..12,
    ) {
        let s = RangeScheduler::new(policy, space, chunk, workers);
        assert_partition(&drain_sequentially(&s), space);
        let s = RangeScheduler::new(policy, space, chunk, workers);
        assert_partition(&drain_concurrently(&s), space);
    }
}
