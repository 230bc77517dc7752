//! In-memory table of registered metrics.
//!
//! Exporters that poll (log lines, CSV files) keep one of these and sample it
//! on every tick. Registration order is preserved so output columns are
//! stable from one run to the next.

use std::fmt;

use serde::Serialize;

use super::{MetricAccessor, MetricExporter};

struct RegisteredMetric {
    name: String,
    description: String,
    accessor: MetricAccessor,
}

/// One sampled value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSample {
    /// Registered metric name.
    pub name: String,
    /// Value returned by the accessor at sampling time.
    pub value: u64,
}

/// Ordered collection of registered metrics.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: Vec<RegisteredMetric>,
}

impl MetricRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Description registered for `name`, if any.
    pub fn description(&self, name: &str) -> Option<&str> {
        self.metrics
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.description.as_str())
    }

    /// Polls every accessor once, in registration order.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.metrics
            .iter()
            .map(|m| MetricSample {
                name: m.name.clone(),
                value: (m.accessor)(),
            })
            .collect()
    }
}

impl MetricExporter for MetricRegistry {
    fn init(&mut self) {
        self.metrics.clear();
    }

    /// Re-registering a name replaces the earlier accessor.
    fn register(&mut self, name: &str, description: &str, accessor: MetricAccessor) {
        let metric = RegisteredMetric {
            name: name.to_string(),
            description: description.to_string(),
            accessor,
        };
        match self.metrics.iter_mut().find(|m| m.name == name) {
            Some(existing) => *existing = metric,
            None => self.metrics.push(metric),
        }
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.metrics.iter().map(|m| &m.name))
            .finish()
    }
}
