//! Seams to the external collaborators
//!
//! The core only talks to the outside world through these traits: the
//! instance directory, the metrics provider, and the remediation API.
//! Production implementations live in [`crate::aws`]; tests use fakes.

use crate::error::ProviderError;
use crate::models::{InstanceFilter, InstanceRef, RemediationAction, TimeSeries};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub use async_trait::async_trait;

/// Metric fetched for every instance
pub const CPU_METRIC_NAME: &str = "CPUUtilization";
/// Namespace of the CPU metric
pub const CPU_METRIC_NAMESPACE: &str = "AWS/EC2";
/// Statistic requested per period
pub const CPU_METRIC_STATISTIC: &str = "Average";
/// Unit of the CPU metric
pub const CPU_METRIC_UNIT: &str = "Percent";

/// Request for one instance's CPU time series
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub instance_id: String,
    pub metric_name: &'static str,
    pub namespace: &'static str,
    pub statistic: &'static str,
    pub unit: &'static str,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period: Duration,
}

impl MetricQuery {
    /// Average CPU over `[end - window, end]`
    pub fn cpu_average(
        instance_id: impl Into<String>,
        end: DateTime<Utc>,
        window: Duration,
        period: Duration,
    ) -> Self {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
        Self {
            instance_id: instance_id.into(),
            metric_name: CPU_METRIC_NAME,
            namespace: CPU_METRIC_NAMESPACE,
            statistic: CPU_METRIC_STATISTIC,
            unit: CPU_METRIC_UNIT,
            start: end - window,
            end,
            period,
        }
    }

    pub fn period_seconds(&self) -> i32 {
        i32::try_from(self.period.as_secs()).unwrap_or(i32::MAX)
    }
}

/// Lists candidate instances. Only a single page is ever read.
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    async fn list_instances(&self, filter: &InstanceFilter)
        -> Result<Vec<InstanceRef>, ProviderError>;
}

/// Returns the time series for one instance
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn get_series(&self, query: &MetricQuery) -> Result<TimeSeries, ProviderError>;
}

/// Destructive per-instance operations
#[async_trait]
pub trait RemediationProvider: Send + Sync {
    async fn terminate(&self, instance_id: &str) -> Result<(), ProviderError>;

    async fn reboot(&self, instance_id: &str) -> Result<(), ProviderError>;

    /// Dispatch on the requested action
    async fn apply(&self, action: RemediationAction, instance_id: &str) -> Result<(), ProviderError> {
        match action {
            RemediationAction::Terminate => self.terminate(instance_id).await,
            RemediationAction::Reboot => self.reboot(instance_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_query_window() {
        let end = Utc::now();
        let query = MetricQuery::cpu_average(
            "i-1",
            end,
            Duration::from_secs(3 * 3600),
            Duration::from_secs(600),
        );

        assert_eq!(query.end - query.start, chrono::Duration::hours(3));
        assert_eq!(query.period_seconds(), 600);
        assert_eq!(query.metric_name, "CPUUtilization");
        assert_eq!(query.namespace, "AWS/EC2");
        assert_eq!(query.statistic, "Average");
        assert_eq!(query.unit, "Percent");
    }
}
