//! The per-unit work engine.
//!
//! Each admitted [`WorkUnit`] generates a random list, sorts it partition by
//! partition (occasionally blocking between partitions to mimic I/O), and
//! finally may hand the sorted list to the hot or cold retention pool.
//!
//! ```text
//! Created ──▶ Initialized ──▶ Partitioning ──▶ Caching ──▶ Done
//!                                  │  ▲
//!                                  ▼  │
//!                                Sleeping ──(shutdown)──▶ Done
//! ```
//!
//! The only artifact of a unit is its sorted list; everything else is
//! discarded when the unit finishes.

mod partition;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

pub use self::partition::Partitioner;

use crate::cache::{build_cache, Cache};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::metrics::WorkloadMetrics;
use crate::random::SharedRng;
use crate::shutdown::ShutdownSignal;

/// The artifact a unit may retain: its fully sorted-by-partition list.
pub type SortedList = Arc<Vec<i32>>;

/// Shared handle to a retention pool of sorted lists.
pub type ListCache = Arc<dyn Cache<SortedList>>;

/// Everything a unit shares with the rest of the process.
///
/// Cheap to clone; the scheduler hands one clone to every unit it admits.
#[derive(Clone)]
pub struct WorkContext {
    /// Validated run parameters.
    pub settings: Arc<Settings>,
    /// The process-wide generator.
    pub rng: SharedRng,
    /// Pool for frequently retained results.
    pub hot_cache: ListCache,
    /// Pool for rarely retained results.
    pub cold_cache: ListCache,
    /// Observability counters.
    pub metrics: Arc<WorkloadMetrics>,
    /// Cancels worker sleeps.
    pub shutdown: ShutdownSignal,
}

impl WorkContext {
    /// Validates `settings` and builds the generator, both pools and fresh counters.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let pool = &settings.pool;
        let hot_cache = build_cache(pool, settings.hot_cache_size)?;
        let cold_cache = build_cache(pool, settings.cold_cache_size)?;
        Ok(Self {
            rng: SharedRng::new(pool.seed),
            hot_cache,
            cold_cache,
            metrics: Arc::new(WorkloadMetrics::new()),
            shutdown: ShutdownSignal::new(),
            settings: Arc::new(settings),
        })
    }

    /// Replaces the shutdown signal, e.g. with one a signal handler already holds.
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }
}

impl fmt::Debug for WorkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkContext")
            .field("settings", &self.settings)
            .field("hot_cache_len", &self.hot_cache.len())
            .field("cold_cache_len", &self.cold_cache.len())
            .field("metrics", &self.metrics)
            .field("shutdown", &self.shutdown.is_triggered())
            .finish()
    }
}

/// Lifecycle of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkState {
    /// Sizes drawn, list not yet generated.
    Created,
    /// List generated, no partition sorted yet.
    Initialized,
    /// Sorting partitions.
    Partitioning,
    /// Blocked between two partitions.
    Sleeping,
    /// All partitions sorted; deciding where the list goes.
    Caching,
    /// Terminal.
    Done,
}

/// Which pool a finished list was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTarget {
    /// The hot pool.
    Hot,
    /// The cold pool.
    Cold,
}

/// What happened to a finished list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The unit never reached the caching step.
    Pending,
    /// The draw chose neither pool.
    Dropped,
    /// Stored in the given pool; the slot is the one drawn for the put.
    Stored(CacheTarget, usize),
    /// A pool was chosen but the operation failed and was skipped.
    Skipped(CacheTarget),
}

/// Outcome of one unit, returned by [`WorkUnit::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSummary {
    /// Length of the generated list.
    pub list_len: usize,
    /// Partition count drawn for the list.
    pub partitions_planned: usize,
    /// Partitions actually sorted.
    pub partitions_sorted: usize,
    /// Times the unit slept between partitions.
    pub sleeps: usize,
    /// Whether shutdown cut the unit short.
    pub interrupted: bool,
    /// Where the list ended up.
    pub placement: Placement,
}

/// One admitted job: generate, partition-and-sort, maybe cache.
pub struct WorkUnit {
    ctx: WorkContext,
    state: WorkState,
    list: Vec<i32>,
    partitioner: Partitioner,
    summary: WorkSummary,
}

impl WorkUnit {
    /// Draws the list length and partition count for a new unit.
    pub fn new(ctx: WorkContext) -> Result<Self> {
        let settings = &ctx.settings;
        let list_len = draw(&ctx.rng, settings.min_list_size, settings.max_list_size)?;
        let partitions = draw(&ctx.rng, settings.min_partitions, settings.max_partitions)?;
        let partitioner = Partitioner::new(list_len, partitions, settings.max_partitions);
        Ok(Self {
            state: WorkState::Created,
            list: Vec::new(),
            partitioner,
            summary: WorkSummary {
                list_len,
                partitions_planned: partitions,
                partitions_sorted: 0,
                sleeps: 0,
                interrupted: false,
                placement: Placement::Pending,
            },
            ctx,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkState {
        self.state
    }

    /// The list as it stands; empty before initialization and after caching.
    pub fn list(&self) -> &[i32] {
        &self.list
    }

    /// Progress so far.
    pub fn summary(&self) -> &WorkSummary {
        &self.summary
    }

    /// Performs exactly one transition and returns the new state.
    pub fn step(&mut self) -> WorkState {
        self.state = match self.state {
            WorkState::Created => {
                self.list = self.ctx.rng.fill_list(self.summary.list_len);
                WorkState::Initialized
            }
            WorkState::Initialized | WorkState::Partitioning => self.sort_next_partition(),
            WorkState::Sleeping => self.sleep(),
            WorkState::Caching => {
                self.summary.placement = self.cache();
                WorkState::Done
            }
            WorkState::Done => WorkState::Done,
        };
        self.state
    }

    /// Drives the unit to [`WorkState::Done`].
    pub fn run(mut self) -> WorkSummary {
        debug!(
            list_len = self.summary.list_len,
            partitions = self.summary.partitions_planned,
            "work unit started"
        );
        while self.step() != WorkState::Done {}
        debug!(summary = ?self.summary, "work unit finished");
        self.summary
    }

    fn sort_next_partition(&mut self) -> WorkState {
        let Some(range) = self.partitioner.next() else {
            return WorkState::Caching;
        };

        let timer = Instant::now();
        self.list[range].sort_unstable();
        self.ctx.metrics.record_work_time(timer.elapsed());
        self.summary.partitions_sorted += 1;

        if self.partitioner.is_exhausted() {
            return WorkState::Caching;
        }
        let draw = self.ctx.rng.percentage();
        if draw <= i64::from(self.ctx.settings.sleep_probability) {
            WorkState::Sleeping
        } else {
            WorkState::Partitioning
        }
    }

    fn sleep(&mut self) -> WorkState {
        let pause = self.ctx.settings.worker_sleep();
        match self.ctx.shutdown.sleep(pause) {
            Ok(()) => {
                self.ctx.metrics.record_sleep_time(pause);
                self.summary.sleeps += 1;
                WorkState::Partitioning
            }
            Err(e) => {
                debug!(
                    error = %e,
                    partitions_sorted = self.summary.partitions_sorted,
                    "work unit abandoned while sleeping"
                );
                self.summary.interrupted = true;
                WorkState::Done
            }
        }
    }

    fn cache(&mut self) -> Placement {
        let settings = &self.ctx.settings;
        let hot = i64::from(settings.hot_probability);
        let cold = i64::from(settings.cold_probability);
        let draw = self.ctx.rng.percentage();

        let (target, cache) = if draw < hot {
            (CacheTarget::Hot, Arc::clone(&self.ctx.hot_cache))
        } else if draw < hot + cold {
            (CacheTarget::Cold, Arc::clone(&self.ctx.cold_cache))
        } else {
            return Placement::Dropped;
        };

        let list = Arc::new(std::mem::take(&mut self.list));
        match place(&self.ctx.rng, cache.as_ref(), list) {
            Ok(index) => Placement::Stored(target, index),
            Err(e) => {
                warn!(
                    kind = e.kind(),
                    error = %e,
                    target = ?target,
                    capacity = cache.capacity(),
                    "problems updating the cache; skipping"
                );
                Placement::Skipped(target)
            }
        }
    }
}

impl fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkUnit")
            .field("state", &self.state)
            .field("partitioner", &self.partitioner)
            .field("summary", &self.summary)
            .finish()
    }
}

/// Picks a random slot, reads and discards it, then stores `list` there.
///
/// The read models replacement pressure; its value is never used.
fn place(rng: &SharedRng, cache: &dyn Cache<SortedList>, list: SortedList) -> Result<usize> {
    let max_index = to_i64(cache.capacity())? - 1;
    let index = to_usize(rng.uniform(0, max_index)?)?;
    let _replaced = cache.get(index)?;
    cache.put(index, list)?;
    Ok(index)
}

fn draw(rng: &SharedRng, min: usize, max: usize) -> Result<usize> {
    to_usize(rng.uniform(to_i64(min)?, to_i64(max)?)?)
}

fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::invalid_argument(format!("{value} exceeds i64")))
}

fn to_usize(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid_argument(format!("{value} is negative")))
}
