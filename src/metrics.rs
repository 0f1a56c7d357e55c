//! Abstract metrics sink: counters, gauges, timers, and histograms keyed by
//! name plus a tag set.
//!
//! The teacher crate wires fixed OpenTelemetry instruments behind
//! `LazyLock<Meter>` statics (`utils/metrics.rs`); this crate needs a
//! dynamically-tagged capability instead, since tag values (command type,
//! service name, adapter name...) are only known at call time. [`MetricsRegistry`]
//! is that capability; [`OtelMetricsRegistry`] realizes it the same way the
//! teacher does, and [`InMemoryMetricsRegistry`] is the test/embedding
//! alternative.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An immutable tag set attached to a single metric emission.
pub type Tags = Vec<(&'static str, String)>;

/// Abstract sink of counters, gauges, timers, and histograms keyed by name + tags.
///
/// Thread/task-safe by contract (`Send + Sync`); emission is always
/// best-effort and must never alter the result of the call it instruments.
pub trait MetricsRegistry: Send + Sync {
    fn counter(&self, name: &str, tags: &Tags, value: u64);
    fn gauge(&self, name: &str, tags: &Tags, value: f64);
    fn timer(&self, name: &str, tags: &Tags, elapsed: Duration);
    fn histogram(&self, name: &str, tags: &Tags, value: f64);
}

/// Convenience helper: increment a counter by one.
pub fn incr(registry: &dyn MetricsRegistry, name: &str, tags: &Tags) {
    registry.counter(name, tags, 1);
}

/// A no-op registry, useful as a default when metrics are not wired up.
#[derive(Debug, Default)]
pub struct NoopMetricsRegistry;

impl MetricsRegistry for NoopMetricsRegistry {
    fn counter(&self, _name: &str, _tags: &Tags, _value: u64) {}
    fn gauge(&self, _name: &str, _tags: &Tags, _value: f64) {}
    fn timer(&self, _name: &str, _tags: &Tags, _elapsed: Duration) {}
    fn histogram(&self, _name: &str, _tags: &Tags, _value: f64) {}
}

/// A single recorded emission, captured for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMetric {
    pub name: String,
    pub tags: Vec<(String, String)>,
    pub value: f64,
}

/// In-memory registry that records every emission; used in tests and when
/// embedding this crate without an external metrics backend.
#[derive(Debug, Default)]
pub struct InMemoryMetricsRegistry {
    recorded: Mutex<Vec<RecordedMetric>>,
}

impl InMemoryMetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<RecordedMetric> {
        self.recorded.lock().expect("metrics lock poisoned").clone()
    }

    pub fn count_matching(&self, name: &str) -> usize {
        self.snapshot().iter().filter(|m| m.name == name).count()
    }

    fn record(&self, name: &str, tags: &Tags, value: f64) {
        let tags = tags.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        self.recorded.lock().expect("metrics lock poisoned").push(RecordedMetric {
            name: name.to_string(),
            tags,
            value,
        });
    }
}

impl MetricsRegistry for InMemoryMetricsRegistry {
    fn counter(&self, name: &str, tags: &Tags, value: u64) {
        self.record(name, tags, value as f64);
    }

    fn gauge(&self, name: &str, tags: &Tags, value: f64) {
        self.record(name, tags, value);
    }

    fn timer(&self, name: &str, tags: &Tags, elapsed: Duration) {
        self.record(name, tags, elapsed.as_secs_f64());
    }

    fn histogram(&self, name: &str, tags: &Tags, value: f64) {
        self.record(name, tags, value);
    }
}

/// OpenTelemetry-backed registry, mirroring the teacher's `LazyLock<Meter>`
/// wiring but creating instruments dynamically per metric name since tags
/// are not known ahead of time.
#[cfg(feature = "otel")]
pub struct OtelMetricsRegistry {
    meter: opentelemetry::metrics::Meter,
    counters: Mutex<HashMap<String, opentelemetry::metrics::Counter<u64>>>,
    histograms: Mutex<HashMap<String, opentelemetry::metrics::Histogram<f64>>>,
    gauges: Mutex<HashMap<String, Arc<opentelemetry::metrics::Gauge<f64>>>>,
}

#[cfg(feature = "otel")]
impl OtelMetricsRegistry {
    pub fn new(service_name: &'static str) -> Self {
        Self {
            meter: opentelemetry::global::meter(service_name),
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
            gauges: Mutex::new(HashMap::new()),
        }
    }

    fn to_kv(tags: &Tags) -> Vec<opentelemetry::KeyValue> {
        tags.iter()
            .map(|(k, v)| opentelemetry::KeyValue::new(*k, v.clone()))
            .collect()
    }
}

#[cfg(feature = "otel")]
impl MetricsRegistry for OtelMetricsRegistry {
    fn counter(&self, name: &str, tags: &Tags, value: u64) {
        let mut counters = self.counters.lock().expect("otel counters lock poisoned");
        let counter = counters
            .entry(name.to_string())
            .or_insert_with(|| self.meter.u64_counter(name.to_string()).build());
        counter.add(value, &Self::to_kv(tags));
    }

    fn gauge(&self, name: &str, tags: &Tags, value: f64) {
        let mut gauges = self.gauges.lock().expect("otel gauges lock poisoned");
        let gauge = gauges
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(self.meter.f64_gauge(name.to_string()).build()));
        gauge.record(value, &Self::to_kv(tags));
    }

    fn timer(&self, name: &str, tags: &Tags, elapsed: Duration) {
        self.histogram(name, tags, elapsed.as_secs_f64());
    }

    fn histogram(&self, name: &str, tags: &Tags, value: f64) {
        let mut histograms = self.histograms.lock().expect("otel histograms lock poisoned");
        let histogram = histograms
            .entry(name.to_string())
            .or_insert_with(|| self.meter.f64_histogram(name.to_string()).build());
        histogram.record(value, &Self::to_kv(tags));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_registry_records_counters() {
        let registry = InMemoryMetricsRegistry::new();
        incr(&registry, "command.sent.total", &vec![("type", "OpenAccount".to_string())]);
        incr(&registry, "command.sent.total", &vec![("type", "OpenAccount".to_string())]);
        assert_eq!(registry.count_matching("command.sent.total"), 2);
    }

    #[test]
    fn noop_registry_does_nothing_observable() {
        let registry = NoopMetricsRegistry;
        registry.counter("x", &vec![], 1);
        registry.timer("y", &vec![], Duration::from_millis(5));
    }
}
