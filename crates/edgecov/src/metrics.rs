//! Metrics collection and reporting using metrics-rs.
//!
//! Writer and replay counters are recorded once a recording finishes. The
//! CLI installs [`CliRecorder`] to print them; library users can install any
//! other `metrics` recorder instead.

use std::collections::HashMap;
use std::sync::Arc;

use edgecov_core::WriterStats;
use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_gauge, gauge,
};
use parking_lot::RwLock;

use crate::replay::ReplaySummary;

// ============================================================================
// Metric descriptions
// ============================================================================

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "edgecov_edges_written_total",
        Unit::Count,
        "Edge records appended to a stream"
    );
    describe_counter!(
        "edgecov_edges_dropped_total",
        Unit::Count,
        "Edges delivered while the writer was disabled"
    );
    describe_counter!(
        "edgecov_segments_opened_total",
        Unit::Count,
        "Stream segments opened (one metadata header each)"
    );
    describe_counter!(
        "edgecov_bytes_written_total",
        Unit::Bytes,
        "Bytes of edge records appended, headers excluded"
    );
    describe_counter!(
        "edgecov_diagnostic_events_total",
        Unit::Count,
        "Network diagnostic events replayed"
    );
    describe_gauge!(
        "edgecov_replay_seconds",
        Unit::Seconds,
        "Wall-clock time of the last replay"
    );
}

// ============================================================================
// Metric recording functions
// ============================================================================

/// Record final writer counters.
pub fn record_writer(stats: &WriterStats) {
    counter!("edgecov_edges_written_total").absolute(stats.edges_written);
    counter!("edgecov_edges_dropped_total").absolute(stats.edges_dropped);
    counter!("edgecov_segments_opened_total").absolute(stats.segments_opened);
    counter!("edgecov_bytes_written_total").absolute(stats.record_bytes);
}

/// Record replay event counts and timing.
pub fn record_replay(summary: &ReplaySummary) {
    counter!("edgecov_diagnostic_events_total", "kind" => "net_transfer")
        .absolute(summary.net_transfers);
    counter!("edgecov_diagnostic_events_total", "kind" => "packet").absolute(summary.packets);
    gauge!("edgecov_replay_seconds").set(summary.elapsed.as_secs_f64());
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

#[derive(Default)]
struct GaugeStorage {
    values: RwLock<HashMap<String, f64>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

struct CliGauge {
    key: String,
    storage: Arc<GaugeStorage>,
}

impl metrics::GaugeFn for CliGauge {
    fn increment(&self, value: f64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0.0) -= value;
    }

    fn set(&self, value: f64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

/// In-memory recorder that prints a summary at exit.
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: Arc::new(CounterStorage::default()),
            gauges: Arc::new(GaugeStorage::default()),
        }
    }

    /// Install as the global recorder.
    ///
    /// Returns `None` if another recorder is already installed.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }

    /// Handle sharing this recorder's storage.
    #[must_use]
    pub fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            counters: Arc::clone(&self.counters),
            gauges: Arc::clone(&self.gauges),
        }
    }
}

impl Default for CliRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(CliGauge {
            key: key_to_string(key),
            storage: Arc::clone(&self.gauges),
        }))
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// Read access to metrics collected by a [`CliRecorder`].
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
}

impl CliRecorderHandle {
    #[must_use]
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    #[must_use]
    pub fn get_gauge(&self, key: &str) -> Option<f64> {
        self.gauges.values.read().get(key).copied()
    }

    /// Print all collected metrics in a human-readable format.
    pub fn print_summary(&self) {
        let counters = self.counters.values.read();
        let gauges = self.gauges.values.read();

        if counters.is_empty() && gauges.is_empty() {
            println!("No metrics collected.");
            return;
        }

        println!();
        println!("## Metrics Summary");
        println!();

        if !counters.is_empty() {
            println!("### Counters");
            let mut entries: Vec<_> = counters.iter().collect();
            entries.sort();
            for (key, value) in entries {
                println!("  {key}: {value}");
            }
            println!();
        }

        if !gauges.is_empty() {
            println!("### Gauges");
            let mut entries: Vec<_> = gauges.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in entries {
                println!("  {key}: {value:.6}");
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_recorder_collects_writer_and_replay_metrics() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_writer(&WriterStats {
                edges_written: 3,
                edges_dropped: 1,
                segments_opened: 2,
                record_bytes: 45,
            });
            record_replay(&ReplaySummary {
                packets: 4,
                elapsed: Duration::from_millis(250),
                ..ReplaySummary::default()
            });
        });

        assert_eq!(handle.get_counter("edgecov_edges_written_total"), Some(3));
        assert_eq!(handle.get_counter("edgecov_segments_opened_total"), Some(2));
        assert_eq!(
            handle.get_counter("edgecov_diagnostic_events_total{kind=packet}"),
            Some(4)
        );
        assert_eq!(handle.get_gauge("edgecov_replay_seconds"), Some(0.25));
    }
}
