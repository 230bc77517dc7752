//! Cached worker pool.
//!
//! Admitted units each need their own execution context because they block
//! (simulated I/O) for long stretches. The pool therefore behaves like a
//! cached thread pool: a job goes to an idle worker when one is waiting,
//! otherwise a new worker thread is spawned, up to a hard ceiling. Workers
//! that stay idle past the keep-alive retire on their own.
//!
//! ```text
//!  execute(job)
//!      │
//!      ├─ idle worker available? ──yes──▶ hand off through the channel
//!      │
//!      ├─ live < max_workers?     ──yes──▶ spawn "workhorse-worker-N" with job
//!      │
//!      └─ otherwise ──▶ Err(ResourceExhausted)
//! ```
//!
//! Admission never blocks: a saturated pool is reported to the caller, which
//! logs it and moves on.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A unit of work runnable on any worker.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that accepts jobs for concurrent execution.
pub trait Executor: Send + Sync {
    /// Starts `job` or explains why it could not be admitted.
    fn execute(&self, job: Job) -> Result<()>;
}

struct PoolShared {
    receiver: Receiver<Job>,
    idle: AtomicUsize,
    live: AtomicUsize,
    keep_alive: Duration,
}

impl PoolShared {
    /// Claims one idle worker, if any is waiting.
    fn claim_idle(&self) -> bool {
        self.idle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    fn worker_loop(&self, first: Job) {
        run_job(first);
        loop {
            self.idle.fetch_add(1, Ordering::AcqRel);
            let job = loop {
                match self.receiver.recv_timeout(self.keep_alive) {
                    Ok(job) => break Some(job),
                    Err(RecvTimeoutError::Timeout) => {
                        // A failed claim means a submitter already counted on
                        // this worker and its job is on the way.
                        if self.claim_idle() {
                            break None;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        // Shutdown: drain whatever was handed off, then leave
                        match self.receiver.try_recv() {
                            Ok(job) => break Some(job),
                            Err(_) => {
                                self.claim_idle();
                                break None;
                            }
                        }
                    }
                }
            };
            match job {
                Some(job) => run_job(job),
                None => break,
            }
        }
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

fn run_job(job: Job) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)).is_err() {
        warn!("work unit panicked; worker continues");
    }
}

/// A pool that grows on demand up to `max_workers` threads.
pub struct CachedWorkerPool {
    shared: Arc<PoolShared>,
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    max_workers: usize,
    spawned: AtomicUsize,
    closed: AtomicBool,
}

impl CachedWorkerPool {
    /// Creates an empty pool; no thread is started until the first job.
    pub fn new(max_workers: usize, keep_alive: Duration) -> Result<Self> {
        if max_workers == 0 {
            return Err(Error::invalid_argument("max_workers must be positive"));
        }
        let (sender, receiver) = crossbeam_channel::unbounded();
        Ok(Self {
            shared: Arc::new(PoolShared {
                receiver,
                idle: AtomicUsize::new(0),
                live: AtomicUsize::new(0),
                keep_alive,
            }),
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(Vec::new()),
            max_workers,
            spawned: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Worker threads currently alive, busy or idle.
    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }

    /// Worker threads waiting for a job.
    pub fn idle_workers(&self) -> usize {
        self.shared.idle.load(Ordering::Acquire)
    }

    /// The configured ceiling on live workers.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn spawn_worker(&self, job: Job) -> Result<()> {
        let reserved = self
            .shared
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_workers).then_some(n + 1)
            });
        if reserved.is_err() {
            return Err(Error::resource_exhausted(format!(
                "all {} workers are busy",
                self.max_workers
            )));
        }

        let id = self.spawned.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("workhorse-worker-{id}"))
            .spawn(move || shared.worker_loop(job));

        match spawned {
            Ok(handle) => {
                let mut handles = self.handles.lock();
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.live.fetch_sub(1, Ordering::AcqRel);
                Err(Error::resource_exhausted(format!(
                    "unable to spawn worker thread: {e}"
                )))
            }
        }
    }

    /// Stops admission and waits up to `grace` for running work.
    ///
    /// Idle workers are released immediately. Returns the number of workers
    /// still running when the grace period ran out; those are left detached.
    pub fn shutdown(&self, grace: Duration) -> usize {
        self.closed.store(true, Ordering::Release);
        // Dropping the only sender disconnects every idle worker
        self.sender.lock().take();

        let deadline = Instant::now() + grace;
        let mut handles = std::mem::take(&mut *self.handles.lock());
        loop {
            let (finished, running): (Vec<_>, Vec<_>) =
                handles.into_iter().partition(|h| h.is_finished());
            for handle in finished {
                if handle.join().is_err() {
                    warn!("worker thread ended with a panic");
                }
            }
            handles = running;
            if handles.is_empty() || Instant::now() >= deadline {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            thread::sleep(Duration::from_millis(5).min(remaining));
        }

        let abandoned = handles.len();
        if abandoned > 0 {
            warn!(
                abandoned,
                ?grace,
                "abandoning workers still running after grace period"
            );
        } else {
            debug!("all workers finished");
        }
        abandoned
    }
}

impl Executor for CachedWorkerPool {
    fn execute(&self, job: Job) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::resource_exhausted("worker pool is shut down"));
        }
        if self.shared.claim_idle() {
            let sender = self.sender.lock();
            if let Some(sender) = sender.as_ref() {
                // Receiver lives in `shared`, which we hold, so send cannot fail
                if let Err(e) = sender.send(job) {
                    self.shared.idle.fetch_add(1, Ordering::AcqRel);
                    return self.spawn_worker(e.into_inner());
                }
                return Ok(());
            }
            return Err(Error::resource_exhausted("worker pool is shut down"));
        }
        self.spawn_worker(job)
    }
}

impl std::fmt::Debug for CachedWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedWorkerPool")
            .field("max_workers", &self.max_workers)
            .field("live", &self.live_workers())
            .field("idle", &self.idle_workers())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
