#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ```text
//!                      ┌──────────────────┐
//!                      │  LoadScheduler   │  one admission per diurnal delay
//!                      └────────┬─────────┘
//!                               │ execute(job)
//!                      ┌────────▼─────────┐
//!                      │ CachedWorkerPool │  grows up to max_workers
//!                      └────────┬─────────┘
//!                               │ WorkUnit::run
//!            ┌──────────────────┼──────────────────┐
//!            ▼                  ▼                  ▼
//!      ┌───────────┐     ┌────────────┐     ┌─────────────┐
//!      │ SharedRng │     │ sort per   │     │ hot / cold  │
//!      │  uniform  │     │ partition  │     │   Cache     │
//!      └───────────┘     └────────────┘     └─────────────┘
//! ```
//!
//! ## Running a Workload In-Process
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//!
//! use workhorse::{CachedWorkerPool, LoadScheduler, Settings, WorkContext};
//!
//! let settings = Settings::default();
//! let pool = Arc::new(
//!     CachedWorkerPool::new(settings.pool.max_workers, settings.pool.keep_alive).unwrap(),
//! );
//! let ctx = WorkContext::from_settings(settings).unwrap();
//! let shutdown = ctx.shutdown.clone();
//!
//! let scheduler = LoadScheduler::new(ctx, Arc::clone(&pool));
//! let handle = thread::spawn(move || scheduler.run());
//!
//! thread::sleep(Duration::from_secs(60));
//! shutdown.trigger();
//! handle.join().unwrap().unwrap();
//! pool.shutdown(Duration::from_secs(5));
//! ```
//!
//! ## Modules
//!
//! - [`scheduler`]: the diurnal admission loop
//! - [`engine`]: the per-unit partition/sort/cache state machine
//! - [`cache`]: hot and cold retention pools
//! - [`pool`]: cached worker pool the scheduler admits into
//! - [`random`]: bounded uniform draws over one shared generator
//! - [`metrics`]: process-wide counters and exporter registration
//! - [`config`]: run parameters and their validation
//! - [`shutdown`]: interruptible sleeps
//! - [`error`]: the error taxonomy

/// Error taxonomy shared by every module.
pub mod error;

/// Run parameters.
///
/// [`config::Settings`] carries every knob of a run with the defaults a
/// standalone process starts from.
pub mod config;

/// Bounded uniform integers over one shared generator.
pub mod random;

/// Fixed-capacity retention pools addressed by slot index.
pub mod cache;

/// Cooperative cancellation for the scheduler and worker sleeps.
pub mod shutdown;

/// Cached worker pool.
pub mod pool;

/// Workload counters and the exporter interface they register with.
pub mod metrics;

/// The per-unit work state machine.
pub mod engine;

/// The master admission loop.
pub mod scheduler;

pub use cache::{
    build_cache, BoundedCache, Cache, CacheKind, MapCache, MapRetention, ShardedCache,
};
pub use config::{PoolSettings, Settings};
pub use engine::{WorkContext, WorkState, WorkSummary, WorkUnit};
pub use error::{Error, Result};
pub use metrics::{MetricExporter, WorkloadMetrics};
pub use pool::{CachedWorkerPool, Executor};
pub use random::SharedRng;
pub use scheduler::LoadScheduler;
pub use shutdown::ShutdownSignal;
