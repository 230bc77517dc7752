// Metric exporters that poll registered counters on a background thread

use std::error::Error as StdError;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};
use workhorse::metrics::{MetricAccessor, MetricExporter, MetricRegistry, MetricSample};
use workhorse::shutdown::ShutdownSignal;

/// Result of writing one batch of samples.
pub type SinkResult = Result<(), Box<dyn StdError + Send + Sync>>;

/// Destination for sampled metric values.
pub trait MetricSink: Send {
    /// Writes every sample taken at `elapsed` since polling started.
    fn record(&mut self, elapsed: Duration, samples: &[MetricSample]) -> SinkResult;
}

impl<S: MetricSink + ?Sized> MetricSink for Box<S> {
    fn record(&mut self, elapsed: Duration, samples: &[MetricSample]) -> SinkResult {
        (**self).record(elapsed, samples)
    }
}

/// Emits each sample as an `info!` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn record(&mut self, elapsed: Duration, samples: &[MetricSample]) -> SinkResult {
        let elapsed_ms = elapsed.as_millis() as u64;
        for sample in samples {
            info!(elapsed_ms, metric = %sample.name, value = sample.value, "metric");
        }
        Ok(())
    }
}

/// CSV row: one sample per line.
#[derive(Debug, Serialize)]
struct CsvSampleRow<'a> {
    elapsed_ms: u64,
    name: &'a str,
    value: u64,
}

/// Appends samples as `elapsed_ms,name,value` rows, flushing after every poll.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    /// Creates (or truncates) the file at `path`.
    pub fn from_path(path: &Path) -> csv::Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps an arbitrary writer.
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }
}

impl<W: Write> std::fmt::Debug for CsvSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink").finish_non_exhaustive()
    }
}

impl<W: Write + Send> MetricSink for CsvSink<W> {
    fn record(&mut self, elapsed: Duration, samples: &[MetricSample]) -> SinkResult {
        let elapsed_ms = elapsed.as_millis() as u64;
        for sample in samples {
            self.writer.serialize(CsvSampleRow {
                elapsed_ms,
                name: &sample.name,
                value: sample.value,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Exporter that samples every registered metric once per interval.
///
/// Register metrics first, then call [`PollingMetricExporter::start`]. The
/// poller thread runs until `shutdown` fires, takes one last sample, and
/// exits; [`PollingMetricExporter::stop`] waits for it.
pub struct PollingMetricExporter<S: MetricSink + 'static> {
    registry: MetricRegistry,
    sink: Option<S>,
    interval: Duration,
    shutdown: ShutdownSignal,
    handle: Option<JoinHandle<S>>,
}

impl<S: MetricSink + 'static> PollingMetricExporter<S> {
    /// Creates an exporter that has not started polling.
    pub fn new(sink: S, interval: Duration, shutdown: ShutdownSignal) -> Self {
        Self {
            registry: MetricRegistry::new(),
            sink: Some(sink),
            interval,
            shutdown,
            handle: None,
        }
    }

    /// Metrics registered so far; empty once polling started.
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Moves the registry and sink onto a thread named `metrics-poller`.
    ///
    /// Calling it a second time does nothing.
    pub fn start(&mut self) -> std::io::Result<()> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        let registry = std::mem::take(&mut self.registry);
        let interval = self.interval;
        let shutdown = self.shutdown.clone();
        debug!(metrics = ?registry, ?interval, "starting metric poller");

        let handle = thread::Builder::new()
            .name("metrics-poller".to_string())
            .spawn(move || {
                let started = Instant::now();
                while shutdown.sleep(interval).is_ok() {
                    poll(&registry, &mut sink, started);
                }
                poll(&registry, &mut sink, started);
                sink
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Waits for the poller to finish its final sample and returns the sink.
    ///
    /// Returns `None` if polling never started or the poller panicked.
    pub fn stop(&mut self) -> Option<S> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(sink) => Some(sink),
            Err(_) => {
                warn!("metric poller panicked");
                None
            }
        }
    }
}

fn poll<S: MetricSink + ?Sized>(registry: &MetricRegistry, sink: &mut S, started: Instant) {
    let samples = registry.snapshot();
    if let Err(e) = sink.record(started.elapsed(), &samples) {
        warn!(error = %e, "failed to export metrics");
    }
}

impl<S: MetricSink + 'static> MetricExporter for PollingMetricExporter<S> {
    fn init(&mut self) {
        self.registry.init();
    }

    fn register(&mut self, name: &str, description: &str, accessor: MetricAccessor) {
        if self.handle.is_some() {
            warn!(metric = name, "metric registered after polling started; ignored");
            return;
        }
        debug!(metric = name, description, "metric registered");
        self.registry.register(name, description, accessor);
    }
}

impl<S: MetricSink + 'static> std::fmt::Debug for PollingMetricExporter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingMetricExporter")
            .field("registry", &self.registry)
            .field("interval", &self.interval)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct VecSink {
        batches: Vec<Vec<MetricSample>>,
    }

    impl MetricSink for VecSink {
        fn record(&mut self, _elapsed: Duration, samples: &[MetricSample]) -> SinkResult {
            self.batches.push(samples.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_csv_sink_rows() {
        let mut sink = CsvSink::from_writer(Vec::new());
        let samples = vec![
            MetricSample {
                name: "a".to_string(),
                value: 1,
            },
            MetricSample {
                name: "b".to_string(),
                value: 2,
            },
        ];
        sink.record(Duration::from_millis(1500), &samples).unwrap();
        sink.record(Duration::from_millis(3000), &samples[..1]).unwrap();

        let text = String::from_utf8(sink.get_ref().clone()).unwrap();
        assert_eq!(
            text,
            "elapsed_ms,name,value\n1500,a,1\n1500,b,2\n3000,a,1\n"
        );
    }

    #[test]
    fn test_poller_samples_until_shutdown() {
        let counter = Arc::new(AtomicU64::new(0));
        let shutdown = ShutdownSignal::new();
        let mut exporter =
            PollingMetricExporter::new(VecSink::default(), Duration::from_millis(5), shutdown.clone());
        exporter.init();
        let c = Arc::clone(&counter);
        exporter.register("count", "a counter", Arc::new(move || c.load(Ordering::Relaxed)));
        assert_eq!(exporter.registry().len(), 1);

        exporter.start().unwrap();
        counter.store(7, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(50));
        shutdown.trigger();

        let sink = exporter.stop().unwrap();
        assert!(sink.batches.len() >= 2);
        let last = sink.batches.last().unwrap();
        assert_eq!(last[0].name, "count");
        assert_eq!(last[0].value, 7);
    }

    #[test]
    fn test_stop_without_start() {
        let mut exporter =
            PollingMetricExporter::new(LogSink, Duration::from_secs(1), ShutdownSignal::new());
        assert!(exporter.stop().is_none());
    }

    #[test]
    fn test_late_registration_ignored() {
        let shutdown = ShutdownSignal::new();
        let mut exporter =
            PollingMetricExporter::new(VecSink::default(), Duration::from_secs(60), shutdown.clone());
        exporter.start().unwrap();
        exporter.register("late", "", Arc::new(|| 1));
        shutdown.trigger();
        let sink = exporter.stop().unwrap();
        assert_eq!(sink.batches, vec![Vec::<MetricSample>::new()]);
    }
}
