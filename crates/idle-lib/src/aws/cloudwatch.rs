//! CloudWatch metrics provider

use crate::error::ProviderError;
use crate::models::{Sample, TimeSeries};
use crate::provider::{async_trait, MetricQuery, MetricsProvider};
use aws_config::SdkConfig;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Datapoint, Dimension, StandardUnit, Statistic};
use aws_sdk_cloudwatch::Client;
use chrono::{DateTime, Utc};

/// `GetMetricStatistics`-backed metrics provider
#[derive(Clone)]
pub struct CloudWatchMetrics {
    client: Client,
}

impl CloudWatchMetrics {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl MetricsProvider for CloudWatchMetrics {
    async fn get_series(&self, query: &MetricQuery) -> Result<TimeSeries, ProviderError> {
        let dimension = Dimension::builder()
            .name("InstanceId")
            .value(&query.instance_id)
            .build()
            .map_err(|e| ProviderError::Metrics {
                instance_id: query.instance_id.clone(),
                message: e.to_string(),
            })?;

        let response = self
            .client
            .get_metric_statistics()
            .namespace(query.namespace)
            .metric_name(query.metric_name)
            .dimensions(dimension)
            .statistics(Statistic::from(query.statistic))
            .unit(StandardUnit::from(query.unit))
            .start_time(AwsDateTime::from_secs(query.start.timestamp()))
            .end_time(AwsDateTime::from_secs(query.end.timestamp()))
            .period(query.period_seconds())
            .send()
            .await
            .map_err(|e| ProviderError::Metrics {
                instance_id: query.instance_id.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(TimeSeries::new(
            response.datapoints().iter().filter_map(to_sample).collect(),
        ))
    }
}

/// Datapoints missing a timestamp or an average are skipped
fn to_sample(datapoint: &Datapoint) -> Option<Sample> {
    let ts = datapoint.timestamp()?;
    let timestamp = DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())?;
    Some(Sample {
        timestamp,
        average: datapoint.average()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datapoint_conversion() {
        let dp = Datapoint::builder()
            .timestamp(AwsDateTime::from_secs(1_700_000_000))
            .average(12.5)
            .build();
        let sample = to_sample(&dp).unwrap();
        assert_eq!(sample.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(sample.average, 12.5);
    }

    #[test]
    fn test_datapoint_without_average_skipped() {
        let dp = Datapoint::builder()
            .timestamp(AwsDateTime::from_secs(1_700_000_000))
            .build();
        assert!(to_sample(&dp).is_none());
    }
}
