//! Workload Metrics System
//!
//! Process-wide counters that exist only for external observability. They
//! carry no control logic: the engine bumps them with atomic adds and an
//! exporter polls them through zero-argument accessors.
//!
//! # Lifecycle
//!
//! 1. [`WorkloadMetrics`] is created at startup and shared behind an `Arc`.
//! 2. The entry point calls [`MetricExporter::init`] and then
//!    [`WorkloadMetrics::register_all`], which hands one accessor per counter
//!    to the exporter.
//! 3. The exporter samples the accessors on its own schedule until shutdown.
//!
//! # Counters
//!
//! | Name | Meaning |
//! |------|---------|
//! | `workhorse_total_number_of_work_items` | units admitted since startup |
//! | `workhorse_master_sleep_time` | delay (ms) the scheduler last slept |
//! | `workhorse_worker_work_time` | cumulative ms workers spent sorting |
//! | `workhorse_worker_sleep_time` | cumulative ms workers spent sleeping |

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod registry;

pub use registry::{MetricRegistry, MetricSample};

/// Zero-argument accessor returning a counter's current value.
pub type MetricAccessor = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Push target for named counters.
///
/// The exporter keeps the accessor and polls it for as long as it likes.
pub trait MetricExporter {
    /// Readies the exporter. Called once, before any registration.
    fn init(&mut self);

    /// Registers a metric under `name`.
    fn register(&mut self, name: &str, description: &str, accessor: MetricAccessor);
}

/// Exporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricExporter;

impl MetricExporter for NullMetricExporter {
    fn init(&mut self) {}

    fn register(&mut self, _name: &str, _description: &str, _accessor: MetricAccessor) {}
}

/// Registered name of the admitted-units counter.
pub const TOTAL_WORK_ITEMS: &str = "workhorse_total_number_of_work_items";
/// Registered name of the last scheduler delay gauge.
pub const MASTER_SLEEP_TIME: &str = "workhorse_master_sleep_time";
/// Registered name of the cumulative worker sort time.
pub const WORKER_WORK_TIME: &str = "workhorse_worker_work_time";
/// Registered name of the cumulative worker sleep time.
pub const WORKER_SLEEP_TIME: &str = "workhorse_worker_sleep_time";

/// The four process-wide workload counters.
#[derive(Default)]
pub struct WorkloadMetrics {
    work_items: AtomicU64,
    scheduler_delay_ms: AtomicU64,
    // Microseconds so that sub-millisecond partitions still add up
    worker_work_us: AtomicU64,
    worker_sleep_ms: AtomicU64,
}

impl WorkloadMetrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one admitted unit.
    pub fn record_admission(&self) {
        self.work_items.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the delay the scheduler is about to sleep.
    pub fn record_scheduler_delay(&self, delay: Duration) {
        self.scheduler_delay_ms
            .store(duration_millis(delay), Ordering::Relaxed);
    }

    /// Adds time a worker spent sorting.
    pub fn record_work_time(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.worker_work_us.fetch_add(micros, Ordering::Relaxed);
    }

    /// Adds time a worker spent sleeping.
    pub fn record_sleep_time(&self, slept: Duration) {
        self.worker_sleep_ms
            .fetch_add(duration_millis(slept), Ordering::Relaxed);
    }

    /// Units admitted since startup.
    pub fn work_items(&self) -> u64 {
        self.work_items.load(Ordering::Relaxed)
    }

    /// Last scheduler delay in milliseconds.
    pub fn scheduler_delay_ms(&self) -> u64 {
        self.scheduler_delay_ms.load(Ordering::Relaxed)
    }

    /// Cumulative sort time in milliseconds.
    pub fn worker_work_ms(&self) -> u64 {
        self.worker_work_us.load(Ordering::Relaxed) / 1000
    }

    /// Cumulative sleep time in milliseconds.
    pub fn worker_sleep_ms(&self) -> u64 {
        self.worker_sleep_ms.load(Ordering::Relaxed)
    }

    /// Registers all four counters with `exporter`.
    pub fn register_all<E: MetricExporter + ?Sized>(self: &Arc<Self>, exporter: &mut E) {
        let metrics = Arc::clone(self);
        exporter.register(
            TOTAL_WORK_ITEMS,
            "The total number of work items started by workers since startup",
            Arc::new(move || metrics.work_items()),
        );
        let metrics = Arc::clone(self);
        exporter.register(
            MASTER_SLEEP_TIME,
            "Amount of time the master slept after scheduling the current worker",
            Arc::new(move || metrics.scheduler_delay_ms()),
        );
        let metrics = Arc::clone(self);
        exporter.register(
            WORKER_WORK_TIME,
            "Amount of wall clock time workers spent in the work state since startup",
            Arc::new(move || metrics.worker_work_ms()),
        );
        let metrics = Arc::clone(self);
        exporter.register(
            WORKER_SLEEP_TIME,
            "The total amount of milliseconds that the workers have slept since startup",
            Arc::new(move || metrics.worker_sleep_ms()),
        );
    }
}

impl fmt::Debug for WorkloadMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadMetrics")
            .field("work_items", &self.work_items())
            .field("scheduler_delay_ms", &self.scheduler_delay_ms())
            .field("worker_work_ms", &self.worker_work_ms())
            .field("worker_sleep_ms", &self.worker_sleep_ms())
            .finish()
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
