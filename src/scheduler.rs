//! The master admission loop.
//!
//! Every cycle admits one [`WorkUnit`] into an [`Executor`], then sleeps for a
//! delay derived from a diurnal curve so the admission rate rises and falls
//! once per configured period:
//!
//! ```text
//! d(t)  = -cos(2π · elapsed_ms / (period_h · 3_600_000)) + 1.5      ∈ [0.5, 2.5]
//! delay = 1000 / max(slope · d(t) + intercept, RATE_EPSILON)  ms
//! ```
//!
//! A rejected admission is logged and the cycle still sleeps. Only an
//! interrupted sleep ends the loop.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::{WorkContext, WorkUnit};
use crate::error::{Error, Result};
use crate::pool::Executor;

/// Smallest admission rate (units per second) the delay formula will divide by.
pub const RATE_EPSILON: f64 = 1e-3;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Diurnal load multiplier after `elapsed` on a curve of `period_hours`.
///
/// Starts at its minimum of 0.5, peaks at 2.5 half a period later.
pub fn diurnal_multiplier(elapsed: Duration, period_hours: f64) -> f64 {
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let phase = 2.0 * PI * elapsed_ms / (period_hours * MILLIS_PER_HOUR);
    -phase.cos() + 1.5
}

/// Delay before the next admission for a given multiplier.
///
/// A rate at or below [`RATE_EPSILON`] (including NaN) is clamped to it.
pub fn admission_delay(slope: f64, intercept: f64, multiplier: f64) -> Duration {
    let rate = (slope * multiplier + intercept).max(RATE_EPSILON);
    Duration::from_millis((1000.0 / rate) as u64)
}

/// Admits work units at a diurnally varying rate.
pub struct LoadScheduler<E: Executor> {
    ctx: WorkContext,
    executor: Arc<E>,
    started: Instant,
}

impl<E: Executor> LoadScheduler<E> {
    /// Creates a scheduler whose diurnal clock starts now.
    pub fn new(ctx: WorkContext, executor: Arc<E>) -> Self {
        Self {
            ctx,
            executor,
            started: Instant::now(),
        }
    }

    /// Shared state handed to every admitted unit.
    pub fn context(&self) -> &WorkContext {
        &self.ctx
    }

    /// Time since the scheduler was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Delay the scheduler would sleep if a cycle ended now.
    pub fn current_delay(&self) -> Duration {
        let settings = &self.ctx.settings;
        let multiplier = diurnal_multiplier(self.elapsed(), settings.diurnal_period_hours);
        admission_delay(settings.rate_slope, settings.rate_intercept, multiplier)
    }

    /// Creates one unit and submits it; counts it only if the executor accepts.
    pub fn admit(&self) -> Result<()> {
        let unit = WorkUnit::new(self.ctx.clone())?;
        self.executor.execute(Box::new(move || {
            unit.run();
        }))?;
        self.ctx.metrics.record_admission();
        Ok(())
    }

    /// One admission followed by one rate-controlled sleep.
    ///
    /// Returns [`Error::Interrupted`] when shutdown cut the sleep short.
    pub fn cycle(&self) -> Result<()> {
        if let Err(e) = self.admit() {
            warn!(kind = e.kind(), error = %e, "work unit rejected; continuing");
        }
        let delay = self.current_delay();
        self.ctx.metrics.record_scheduler_delay(delay);
        debug!(delay_ms = delay.as_millis() as u64, "scheduler sleeping");
        self.ctx.shutdown.sleep(delay)
    }

    /// Cycles until shutdown.
    pub fn run(&self) -> Result<()> {
        info!(
            slope = self.ctx.settings.rate_slope,
            intercept = self.ctx.settings.rate_intercept,
            period_hours = self.ctx.settings.diurnal_period_hours,
            "scheduler started"
        );
        loop {
            match self.cycle() {
                Ok(()) => {}
                Err(Error::Interrupted) => {
                    info!(
                        admitted = self.ctx.metrics.work_items(),
                        "scheduler stopped"
                    );
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<E: Executor> fmt::Debug for LoadScheduler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadScheduler")
            .field("ctx", &self.ctx)
            .field("elapsed", &self.elapsed())
            .finish()
    }
}
