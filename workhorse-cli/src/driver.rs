// Wires flags, pool, scheduler and exporter together for one run

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use workhorse::metrics::MetricExporter;
use workhorse::{CachedWorkerPool, LoadScheduler, ShutdownSignal, WorkContext};

use crate::exporter::{CsvSink, LogSink, MetricSink, PollingMetricExporter};
use crate::flags::Flags;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Units admitted over the whole run.
    pub admitted: u64,
    /// Workers still busy when the grace period ran out.
    pub abandoned: usize,
}

/// Runs the workload until `shutdown` fires or `--run-for-secs` elapses.
///
/// Whatever ends the run, admission stops first, running units get the
/// configured grace period, and the exporter takes its final sample.
pub fn run(
    flags: &Flags,
    supplemental: &[String],
    shutdown: ShutdownSignal,
) -> Result<RunReport, Box<dyn Error>> {
    flags.supplemental_processor().process(supplemental)?;

    let settings = flags.to_settings();
    info!(?settings, "starting workhorse");
    let grace = settings.pool.shutdown_grace;
    let pool = Arc::new(CachedWorkerPool::new(
        settings.pool.max_workers,
        settings.pool.keep_alive,
    )?);
    let ctx = WorkContext::from_settings(settings)?.with_shutdown(shutdown.clone());

    let sink: Box<dyn MetricSink> = match &flags.metrics_csv {
        Some(path) => Box::new(open_csv(path)?),
        None => Box::new(LogSink),
    };
    let interval = Duration::from_millis(flags.metrics_interval_ms.max(1));
    let mut exporter = PollingMetricExporter::new(sink, interval, shutdown.clone());
    exporter.init();
    ctx.metrics.register_all(&mut exporter);
    exporter.start()?;

    let metrics = Arc::clone(&ctx.metrics);
    let scheduler = LoadScheduler::new(ctx, Arc::clone(&pool));
    let handle = thread::Builder::new()
        .name("scheduler".to_string())
        .spawn(move || scheduler.run())?;

    if let Some(secs) = flags.run_for_secs {
        // Err means someone else already triggered shutdown
        if shutdown.sleep(Duration::from_secs(secs)).is_ok() {
            info!(secs, "run time elapsed; shutting down");
            shutdown.trigger();
        }
    }

    let outcome = handle.join();
    shutdown.trigger();
    let abandoned = pool.shutdown(grace);
    exporter.stop();

    match outcome {
        Ok(result) => result?,
        Err(_) => return Err("scheduler thread panicked".into()),
    }
    if abandoned > 0 {
        warn!(abandoned, "some work units did not finish within the grace period");
    }
    let admitted = metrics.work_items();
    info!(admitted, "workhorse stopped");
    Ok(RunReport {
        admitted,
        abandoned,
    })
}

fn open_csv(path: &Path) -> Result<CsvSink<std::fs::File>, Box<dyn Error>> {
    CsvSink::from_path(path)
        .map_err(|e| format!("unable to open metrics file {}: {e}", path.display()).into())
}
