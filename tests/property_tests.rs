//! Property Tests
//!
//! "For all" properties of the workload building blocks, checked with
//! proptest over generated inputs.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use workhorse::engine::Partitioner;
use workhorse::random::uniform;
use workhorse::{BoundedCache, Cache, ShardedCache};

proptest! {
    #[test]
    fn prop_uniform_stays_in_range(
        seed in any::<u64>(),
        min in -1_000i64..1_000,
        span in 0i64..1_000,
    ) {
        let max = (min + span).max(1);
        let min = min.min(max);
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..64 {
            let v = uniform(min, max, &mut rng).unwrap();
            prop_assert!(min <= v && v <= max, "{} not in [{}, {}]", v, min, max);
        }
    }

    #[test]
    fn prop_uniform_rejects_non_positive_max(min in -1_000i64..=0, max in -1_000i64..=0) {
        let mut rng = StdRng::seed_from_u64(0);
        prop_assert!(uniform(min, max, &mut rng).is_err());
    }

    #[test]
    fn prop_partitions_cover_exactly_once(len in 1usize..5_000, p in 1usize..200) {
        let p = p.min(len);
        let ranges: Vec<_> = Partitioner::new(len, p, p).collect();

        prop_assert_eq!(ranges.len(), p);
        let mut next = 0;
        for range in &ranges {
            prop_assert_eq!(range.start, next);
            prop_assert!(range.start < range.end);
            next = range.end;
        }
        prop_assert_eq!(next, len);
    }

    #[test]
    fn prop_partition_guard_caps_count(len in 1usize..5_000, p in 1usize..200, guard in 1usize..200) {
        let p = p.min(len);
        let ranges: Vec<_> = Partitioner::new(len, p, guard).collect();
        prop_assert_eq!(ranges.len(), p.min(guard));
        prop_assert_eq!(ranges.last().map(|r| r.end), Some(len));
    }

    #[test]
    fn prop_partition_sort_permutes_and_is_idempotent(
        values in prop::collection::vec(any::<i32>(), 1..2_000),
        p in 1usize..50,
    ) {
        let p = p.min(values.len());
        let mut list = values.clone();
        for range in Partitioner::new(list.len(), p, p) {
            list[range].sort_unstable();
        }

        let mut before = values;
        let mut after = list.clone();
        before.sort_unstable();
        after.sort_unstable();
        prop_assert_eq!(before, after);

        let mut again = list.clone();
        for range in Partitioner::new(again.len(), p, p) {
            again[range].sort_unstable();
        }
        prop_assert_eq!(again, list);
    }

    #[test]
    fn prop_caches_never_exceed_capacity(
        capacity in 1usize..64,
        segments in 1usize..16,
        ops in prop::collection::vec(0usize..128, 0..500),
    ) {
        let bounded = BoundedCache::new(capacity).unwrap();
        let sharded = ShardedCache::with_segments(capacity, segments).unwrap();
        for (value, index) in ops.into_iter().enumerate() {
            let _ = bounded.put(index, value);
            let _ = sharded.put(index, value);
            prop_assert!(bounded.len() <= capacity);
            prop_assert!(sharded.len() <= capacity);
        }
    }
}
