//! Allocation Tests
//!
//! The workload exists to put pressure on the allocator, so these tests
//! measure it directly with an instrumented global allocator. Everything runs
//! inside one test so no other test thread disturbs the counters.

use std::alloc::System;
use std::mem::size_of;
use std::sync::Arc;

use stats_alloc::{Region, StatsAlloc, INSTRUMENTED_SYSTEM};
use workhorse::engine::{CacheTarget, Placement};
use workhorse::{Settings, WorkContext, WorkUnit};

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

const LIST_LEN: usize = 100_000;

fn settings(hot_probability: u8) -> Settings {
    let mut settings = Settings {
        min_list_size: LIST_LEN,
        max_list_size: LIST_LEN,
        min_partitions: 10,
        max_partitions: 10,
        hot_probability,
        cold_probability: 0,
        hot_cache_size: 4,
        sleep_probability: 0,
        ..Settings::default()
    };
    settings.pool.seed = Some(8);
    settings
}

#[test]
fn test_unit_allocation_and_retention() {
    let list_bytes = LIST_LEN * size_of::<i32>();

    // Dropped result: the list is allocated and released again
    let ctx = WorkContext::from_settings(settings(0)).unwrap();
    let region = Region::new(GLOBAL);
    let summary = WorkUnit::new(ctx.clone()).unwrap().run();
    let change = region.change();
    assert_eq!(summary.placement, Placement::Dropped);
    assert!(change.bytes_allocated >= list_bytes);
    assert!(change.bytes_deallocated >= list_bytes);

    // Retained result: the list outlives the unit inside the hot pool
    // The context outlives the region so dropping it does not offset the count
    let ctx = WorkContext::from_settings(settings(100)).unwrap();
    let hot = Arc::clone(&ctx.hot_cache);
    let region = Region::new(GLOBAL);
    let summary = WorkUnit::new(ctx.clone()).unwrap().run();
    let change = region.change();
    drop(ctx);
    assert!(matches!(
        summary.placement,
        Placement::Stored(CacheTarget::Hot, _)
    ));
    assert_eq!(hot.len(), 1);
    let retained = change.bytes_allocated as isize - change.bytes_deallocated as isize;
    assert!(retained >= list_bytes as isize, "retained {retained} bytes");
}
