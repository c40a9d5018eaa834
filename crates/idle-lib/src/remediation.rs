//! Remediation of bad instances
//!
//! Applies terminate or reboot to each target one at a time. Calls are
//! never issued concurrently, and a failure on one instance does not stop
//! the sweep. The caller is responsible for confirming the target list
//! before invoking the executor.

use crate::models::{InstanceRef, RemediationAction};
use crate::observability::{StructuredLogger, SweepMetrics};
use crate::provider::RemediationProvider;
use crate::run::ProgressReporter;
use std::sync::Arc;
use tracing::info;

/// Outcome of remediating one instance
#[derive(Debug, Clone, PartialEq)]
pub struct RemediationOutcome {
    pub instance: InstanceRef,
    pub error: Option<String>,
}

impl RemediationOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-instance outcomes of a sweep, in target order
#[derive(Debug, Clone)]
pub struct RemediationReport {
    pub action: RemediationAction,
    pub outcomes: Vec<RemediationOutcome>,
}

impl RemediationReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RemediationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Serialized remediation loop
pub struct RemediationExecutor {
    provider: Arc<dyn RemediationProvider>,
    logger: StructuredLogger,
    metrics: SweepMetrics,
}

impl RemediationExecutor {
    pub fn new(provider: Arc<dyn RemediationProvider>, name_tag: impl Into<String>) -> Self {
        Self {
            provider,
            logger: StructuredLogger::new(name_tag),
            metrics: SweepMetrics::new(),
        }
    }

    /// Apply `action` to every target, strictly in order
    pub async fn remediate(
        &self,
        targets: &[InstanceRef],
        action: RemediationAction,
        progress: &dyn ProgressReporter,
    ) -> RemediationReport {
        let total = targets.len();
        info!(action = action.as_str(), targets = total, "Starting remediation");
        progress.on_start(total);

        let mut outcomes = Vec::with_capacity(total);
        for (i, instance) in targets.iter().enumerate() {
            let error = self
                .provider
                .apply(action, &instance.id)
                .await
                .err()
                .map(|e| e.to_string());

            self.logger
                .log_remediation(action, &instance.id, error.as_deref());
            self.metrics.inc_remediation(action, error.is_none());

            outcomes.push(RemediationOutcome {
                instance: instance.clone(),
                error,
            });
            progress.on_progress(i + 1, total);
        }
        progress.on_finish();

        let report = RemediationReport { action, outcomes };
        info!(
            action = action.as_str(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Remediation complete"
        );
        report
    }
}
