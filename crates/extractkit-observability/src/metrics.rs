//! ExtractKit metrics definitions.
//!
//! All metrics use OpenTelemetry conventions and are no-ops until the
//! application installs a meter provider.

use extractkit_core::{PipelineError, RunSummary};
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Central metrics handle for pipeline runs.
#[derive(Clone)]
pub struct PipelineMetrics {
    pub records_dispatched: Counter<u64>,
    pub batches_dispatched: Counter<u64>,
    pub runs_failed: Counter<u64>,
    pub run_duration_ms: Histogram<f64>,
}

impl PipelineMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            records_dispatched: meter
                .u64_counter("extractkit.records_dispatched")
                .with_description("Records in batches the processor accepted")
                .build(),
            batches_dispatched: meter
                .u64_counter("extractkit.batches_dispatched")
                .with_description("Batches the processor accepted")
                .build(),
            runs_failed: meter
                .u64_counter("extractkit.runs_failed")
                .with_description("Runs that settled with an error")
                .build(),
            run_duration_ms: meter
                .f64_histogram("extractkit.run_duration_ms")
                .with_description("Wall time of successful runs in milliseconds")
                .build(),
        }
    }

    /// Metrics bound to the global meter provider.
    pub fn global() -> Self {
        Self::new(&global::meter("extractkit"))
    }

    pub fn record_run(&self, summary: &RunSummary) {
        let attrs = [KeyValue::new("format", summary.format.to_string())];
        self.records_dispatched.add(summary.records, &attrs);
        self.batches_dispatched.add(summary.batches, &attrs);
        self.run_duration_ms
            .record(summary.elapsed.as_secs_f64() * 1000.0, &attrs);
    }

    pub fn record_failure(&self, err: &PipelineError) {
        self.runs_failed
            .add(1, &[KeyValue::new("error_kind", err.kind())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractkit_core::Format;
    use std::time::Duration;

    #[test]
    fn recording_without_a_provider_is_a_noop() {
        let metrics = PipelineMetrics::global();
        metrics.record_run(&RunSummary {
            url: "mem://x".into(),
            format: Format::Csv,
            batches: 2,
            records: 150,
            elapsed: Duration::from_millis(12),
        });
        metrics.record_failure(&PipelineError::Cancelled);
    }
}
