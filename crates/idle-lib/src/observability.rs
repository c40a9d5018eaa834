//! Observability for the sweep
//!
//! Provides:
//! - Prometheus counters for classifications, fetch errors and remediations
//! - A fetch-latency histogram
//! - Structured logging of per-instance events with tracing

use crate::models::{Bucket, ClassificationResult, RemediationAction};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for metrics-provider latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SweepMetricsInner> = OnceLock::new();

struct SweepMetricsInner {
    instances_classified: IntCounterVec,
    fetch_errors: IntCounter,
    fetch_latency_seconds: Histogram,
    remediations: IntCounterVec,
}

impl SweepMetricsInner {
    fn new() -> Self {
        Self {
            instances_classified: register_int_counter_vec!(
                "idle_sweep_instances_classified_total",
                "Instances classified, by resulting bucket",
                &["classification"]
            )
            .expect("Failed to register instances_classified_total"),

            fetch_errors: register_int_counter!(
                "idle_sweep_fetch_errors_total",
                "Metrics requests that failed"
            )
            .expect("Failed to register fetch_errors_total"),

            fetch_latency_seconds: register_histogram!(
                "idle_sweep_fetch_latency_seconds",
                "Time spent fetching one instance's CPU series",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            remediations: register_int_counter_vec!(
                "idle_sweep_remediations_total",
                "Remediation calls, by action and outcome",
                &["action", "outcome"]
            )
            .expect("Failed to register remediations_total"),
        }
    }
}

/// Handle to the process-wide sweep metrics.
///
/// Clones share the same underlying counters.
#[derive(Clone)]
pub struct SweepMetrics {
    _private: (),
}

impl Default for SweepMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SweepMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SweepMetricsInner {
        GLOBAL_METRICS.get_or_init(SweepMetricsInner::new)
    }

    pub fn inc_classified(&self, bucket: Bucket) {
        self.inner()
            .instances_classified
            .with_label_values(&[bucket.as_str()])
            .inc();
    }

    pub fn classified_count(&self, bucket: Bucket) -> u64 {
        self.inner()
            .instances_classified
            .with_label_values(&[bucket.as_str()])
            .get()
    }

    pub fn inc_fetch_errors(&self) {
        self.inner().fetch_errors.inc();
    }

    pub fn fetch_error_count(&self) -> u64 {
        self.inner().fetch_errors.get()
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    pub fn inc_remediation(&self, action: RemediationAction, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .remediations
            .with_label_values(&[action.as_str(), outcome])
            .inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export_text(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Structured logger for sweep events
#[derive(Clone)]
pub struct StructuredLogger {
    name_tag: String,
}

impl StructuredLogger {
    pub fn new(name_tag: impl Into<String>) -> Self {
        Self {
            name_tag: name_tag.into(),
        }
    }

    pub fn log_classification(&self, result: &ClassificationResult) {
        info!(
            event = "instance_classified",
            name_tag = %self.name_tag,
            instance_id = %result.instance.id,
            classification = result.classification.bucket().as_str(),
            reason = result.reason().map(|r| r.as_str()).unwrap_or(""),
            score = result.score(),
            "Classified instance"
        );
    }

    pub fn log_remediation(
        &self,
        action: RemediationAction,
        instance_id: &str,
        error: Option<&str>,
    ) {
        match error {
            None => info!(
                event = "remediation_attempted",
                name_tag = %self.name_tag,
                action = action.as_str(),
                instance_id = %instance_id,
                success = true,
                "Remediation succeeded"
            ),
            Some(error) => warn!(
                event = "remediation_attempted",
                name_tag = %self.name_tag,
                action = action.as_str(),
                instance_id = %instance_id,
                success = false,
                error = %error,
                "Remediation failed"
            ),
        }
    }

    pub fn log_run_summary(&self, bad: usize, good: usize, unknown: usize, fetch_errors: usize) {
        info!(
            event = "run_completed",
            name_tag = %self.name_tag,
            bad = bad,
            good = good,
            unknown = unknown,
            fetch_errors = fetch_errors,
            "Classification run complete"
        );
    }
}
