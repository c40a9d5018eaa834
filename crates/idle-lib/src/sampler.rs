//! CPU time-series retrieval for one instance

use crate::error::ProviderError;
use crate::models::{InstanceRef, TimeSeries};
use crate::provider::{MetricQuery, MetricsProvider};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default lookback window (3 hours)
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(3 * 60 * 60);

/// Default sampling period (10 minutes)
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10 * 60);

/// Fetches a fixed-window, fixed-period average-CPU series.
///
/// One provider call per instance: no batching, paging or retry. Errors
/// are handed straight back to the caller.
#[derive(Clone)]
pub struct MetricSampler {
    provider: Arc<dyn MetricsProvider>,
    window: Duration,
    period: Duration,
}

impl MetricSampler {
    pub fn new(provider: Arc<dyn MetricsProvider>) -> Self {
        Self {
            provider,
            window: DEFAULT_LOOKBACK,
            period: DEFAULT_PERIOD,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sample the trailing window ending now
    pub async fn sample(&self, instance: &InstanceRef) -> Result<TimeSeries, ProviderError> {
        let query = MetricQuery::cpu_average(&instance.id, Utc::now(), self.window, self.period);
        let series = self.provider.get_series(&query).await?;
        debug!(
            instance_id = %instance.id,
            samples = series.len(),
            "Fetched CPU series"
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        queries: Mutex<Vec<MetricQuery>>,
    }

    #[async_trait]
    impl MetricsProvider for RecordingProvider {
        async fn get_series(&self, query: &MetricQuery) -> Result<TimeSeries, ProviderError> {
            self.queries.lock().unwrap().push(query.clone());
            if query.instance_id == "i-broken" {
                return Err(ProviderError::Metrics {
                    instance_id: query.instance_id.clone(),
                    message: "throttled".into(),
                });
            }
            Ok(TimeSeries::from_values(&[1.0, 2.0]))
        }
    }

    #[tokio::test]
    async fn test_sample_issues_one_query() {
        let provider = Arc::new(RecordingProvider::default());
        let sampler = MetricSampler::new(provider.clone())
            .with_window(Duration::from_secs(3600))
            .with_period(Duration::from_secs(300));

        let series = sampler
            .sample(&InstanceRef::new("i-1", None))
            .await
            .unwrap();
        assert_eq!(series.len(), 2);

        let queries = provider.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].instance_id, "i-1");
        assert_eq!(queries[0].period_seconds(), 300);
        assert_eq!(queries[0].end - queries[0].start, chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn test_sample_propagates_error() {
        let provider = Arc::new(RecordingProvider::default());
        let sampler = MetricSampler::new(provider);

        let err = sampler
            .sample(&InstanceRef::new("i-broken", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Metrics { .. }));
    }
}
