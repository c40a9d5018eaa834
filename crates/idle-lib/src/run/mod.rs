//! Classification run
//!
//! Lists the candidate instances, fans the sample → classify → record
//! pipeline out over them with a concurrency cap, and returns the three
//! result buckets once every instance is accounted for.

#[cfg(test)]
mod tests;

use crate::aggregator::{ResultAggregator, ResultSet};
use crate::classifier::{classify, ClassifierConfig};
use crate::error::RunError;
use crate::fanout::{BoundedFanOut, FanOutReport};
use crate::models::{Classification, ClassificationResult, InstanceFilter, InstanceRef, UnknownCause};
use crate::observability::{StructuredLogger, SweepMetrics};
use crate::provider::{InstanceDirectory, MetricsProvider};
use crate::sampler::{MetricSampler, DEFAULT_LOOKBACK, DEFAULT_PERIOD};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Default number of concurrent metrics requests
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Immutable configuration for one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum metrics requests in flight
    pub concurrency: usize,
    /// Trailing window to sample
    pub lookback: Duration,
    /// Sampling period of the series
    pub period: Duration,
    pub classifier: ClassifierConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            lookback: DEFAULT_LOOKBACK,
            period: DEFAULT_PERIOD,
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Receives progress updates from a run or a remediation sweep
pub trait ProgressReporter: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_progress(&self, processed: usize, total: usize);

    fn on_finish(&self) {}
}

/// Progress sink that discards updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn on_progress(&self, _processed: usize, _total: usize) {}
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: ResultSet,
    /// Per-instance outcome of the fan-out, in listing order
    pub fan_out: FanOutReport,
}

impl RunReport {
    pub fn fetch_failures(&self) -> usize {
        self.fan_out.failed()
    }
}

/// Orchestrates listing, sampling, classification and aggregation
pub struct ClassificationRun {
    directory: Arc<dyn InstanceDirectory>,
    sampler: MetricSampler,
    config: RunConfig,
    metrics: SweepMetrics,
}

impl ClassificationRun {
    pub fn new(
        directory: Arc<dyn InstanceDirectory>,
        metrics_provider: Arc<dyn MetricsProvider>,
        config: RunConfig,
    ) -> Self {
        let sampler = MetricSampler::new(metrics_provider)
            .with_window(config.lookback)
            .with_period(config.period);

        Self {
            directory,
            sampler,
            config,
            metrics: SweepMetrics::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Classify every instance matching `filter`
    pub async fn execute(
        &self,
        filter: &InstanceFilter,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<ResultSet, RunError> {
        Ok(self.execute_detailed(filter, progress).await?.results)
    }

    /// Like [`execute`](Self::execute), also returning the fan-out outcomes
    pub async fn execute_detailed(
        &self,
        filter: &InstanceFilter,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<RunReport, RunError> {
        let listed = self.directory.list_instances(filter).await.map_err(|e| {
            error!(name_tag = %filter.name_tag, error = %e, "Instance listing failed");
            RunError::Directory(e)
        })?;

        let instances = dedupe(listed);
        let total = instances.len();
        info!(
            name_tag = %filter.name_tag,
            instances = total,
            concurrency = self.config.concurrency,
            "Found matching instances"
        );
        progress.on_start(total);

        let aggregator = Arc::new(ResultAggregator::new());
        let logger = StructuredLogger::new(&filter.name_tag);

        let fan_out = {
            let aggregator = Arc::clone(&aggregator);
            let sampler = self.sampler.clone();
            let classifier = self.config.classifier;
            let metrics = self.metrics.clone();
            let logger = logger.clone();
            let progress = Arc::clone(&progress);

            BoundedFanOut::new(self.config.concurrency)
                .run(instances.clone(), move |instance: InstanceRef| {
                    let aggregator = Arc::clone(&aggregator);
                    let sampler = sampler.clone();
                    let metrics = metrics.clone();
                    let logger = logger.clone();
                    let progress = Arc::clone(&progress);

                    async move {
                        let started = Instant::now();
                        let fetched = sampler.sample(&instance).await;
                        metrics.observe_fetch_latency(started.elapsed().as_secs_f64());

                        let (classification, failure) = match fetched {
                            Ok(series) => (classify(&series, &classifier), None),
                            Err(e) => {
                                metrics.inc_fetch_errors();
                                let cause = UnknownCause::FetchFailed {
                                    error: e.to_string(),
                                };
                                (Classification::Unknown { cause }, Some(e))
                            }
                        };

                        let result = ClassificationResult::new(instance, classification);
                        logger.log_classification(&result);
                        metrics.inc_classified(result.classification.bucket());

                        let processed = aggregator.record(result);
                        progress.on_progress(processed, total);

                        match failure {
                            Some(e) => Err(e),
                            None => Ok(()),
                        }
                    }
                })
                .await
        };

        // Anything the fan-out lost before recording still lands in Unknown
        for (index, reason) in fan_out.failures() {
            let instance = &instances[index];
            if aggregator.contains(&instance.id) {
                continue;
            }
            warn!(instance_id = %instance.id, reason = %reason, "Recording unprocessed instance as unknown");
            let cause = UnknownCause::FetchFailed {
                error: reason.to_string(),
            };
            let result = ClassificationResult::new(instance.clone(), Classification::Unknown { cause });
            self.metrics.inc_classified(result.classification.bucket());
            let processed = aggregator.record(result);
            progress.on_progress(processed, total);
        }
        progress.on_finish();

        let results = aggregator.snapshot();
        logger.log_run_summary(
            results.bad.len(),
            results.good.len(),
            results.unknown.len(),
            fan_out.failed(),
        );

        Ok(RunReport { results, fan_out })
    }
}

/// Drop repeated instance ids, keeping the first occurrence
fn dedupe(instances: Vec<InstanceRef>) -> Vec<InstanceRef> {
    let mut seen = HashSet::with_capacity(instances.len());
    let before = instances.len();
    let unique: Vec<InstanceRef> = instances
        .into_iter()
        .filter(|i| seen.insert(i.id.clone()))
        .collect();
    if unique.len() != before {
        warn!(
            duplicates = before - unique.len(),
            "Instance listing contained repeated ids"
        );
    }
    unique
}
