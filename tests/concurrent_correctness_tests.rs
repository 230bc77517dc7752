//! Concurrent Worker Pool and Shutdown Correctness Tests
//!
//! These tests validate that admission, execution and cancellation keep their
//! guarantees while many threads submit at once.
//!
//! ## Test Strategy
//!
//! Unlike stress tests that focus on throughput and lack of panics, these tests:
//! - Count every job that was accepted and every job that actually ran
//! - Block workers deliberately to reach the pool's ceiling
//! - Verify shutdown is bounded by the grace period and releases sleepers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use workhorse::{CachedWorkerPool, Error, Executor, ShutdownSignal};

/// Every accepted job runs exactly once; rejected ones never run
#[test]
fn test_accepted_jobs_run_exactly_once() {
    let pool = Arc::new(CachedWorkerPool::new(8, Duration::from_secs(1)).unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let ran = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        let accepted = Arc::clone(&accepted);
        let ran = Arc::clone(&ran);
        handles.push(thread::spawn(move || {
            for _ in 0..500 {
                let ran = Arc::clone(&ran);
                match pool.execute(Box::new(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                })) {
                    Ok(()) => {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(Error::ResourceExhausted { .. }) => {}
                    Err(e) => panic!("unexpected error {e}"),
                }
            }
        }));
    }
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(pool.shutdown(Duration::from_secs(5)), 0);
    assert!(accepted.load(Ordering::SeqCst) > 0);
    assert_eq!(ran.load(Ordering::SeqCst), accepted.load(Ordering::SeqCst));
}

/// Live workers never exceed the ceiling, and saturation is reported, not blocked on
#[test]
fn test_ceiling_holds_under_concurrent_submitters() {
    let pool = Arc::new(CachedWorkerPool::new(4, Duration::from_secs(1)).unwrap());
    let (release_tx, release_rx) = bounded::<()>(0);
    let rejected = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        let rejected = Arc::clone(&rejected);
        let release_rx = release_rx.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..4 {
                let rx = release_rx.clone();
                let started = Instant::now();
                if pool
                    .execute(Box::new(move || {
                        let _ = rx.recv();
                    }))
                    .is_err()
                {
                    rejected.fetch_add(1, Ordering::SeqCst);
                }
                assert!(started.elapsed() < Duration::from_secs(1));
                assert!(pool.live_workers() <= 4);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(pool.live_workers(), 4);
    assert_eq!(rejected.load(Ordering::SeqCst), 32 - 4);
    drop(release_tx);
    assert_eq!(pool.shutdown(Duration::from_secs(5)), 0);
}

/// One trigger releases every sleeper promptly
#[test]
fn test_trigger_releases_all_sleepers() {
    let signal = ShutdownSignal::new();
    let released = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let signal = signal.clone();
            let released = Arc::clone(&released);
            thread::spawn(move || {
                if signal.sleep(Duration::from_secs(60)) == Err(Error::Interrupted) {
                    released.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    signal.trigger();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(released.load(Ordering::SeqCst), 16);
}
