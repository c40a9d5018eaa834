//! Integration tests for the classification run
//!
//! These tests drive the full list → sample → classify → record pipeline
//! against in-memory collaborators.

use super::*;
use crate::error::ProviderError;
use crate::models::{Bucket, NetworkMode, Reason, TimeSeries};
use crate::provider::{async_trait, MetricQuery};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Directory returning a fixed listing and recording the filters it saw
struct FakeDirectory {
    instances: Vec<InstanceRef>,
    fail: bool,
    filters: Mutex<Vec<InstanceFilter>>,
}

impl FakeDirectory {
    fn with_ids(ids: &[&str]) -> Self {
        Self {
            instances: ids
                .iter()
                .map(|id| InstanceRef::new(*id, Some(format!("{}.compute.internal", id))))
                .collect(),
            fail: false,
            filters: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            instances: Vec::new(),
            fail: true,
            filters: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InstanceDirectory for FakeDirectory {
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
    ) -> Result<Vec<InstanceRef>, ProviderError> {
        self.filters.lock().unwrap().push(filter.clone());
        if self.fail {
            return Err(ProviderError::Directory("access denied".into()));
        }
        Ok(self.instances.clone())
    }
}

/// Metrics provider serving canned series; unknown ids fail
#[derive(Default)]
struct FakeMetrics {
    series: HashMap<String, Vec<f64>>,
    calls: AtomicUsize,
}

impl FakeMetrics {
    fn with(mut self, id: &str, values: Vec<f64>) -> Self {
        self.series.insert(id.to_string(), values);
        self
    }
}

#[async_trait]
impl MetricsProvider for FakeMetrics {
    async fn get_series(&self, query: &MetricQuery) -> Result<TimeSeries, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.series.get(&query.instance_id) {
            Some(values) => Ok(TimeSeries::from_values(values)),
            None => Err(ProviderError::Metrics {
                instance_id: query.instance_id.clone(),
                message: "throttled".into(),
            }),
        }
    }
}

/// Progress sink remembering every update
#[derive(Default)]
struct RecordingProgress {
    started: Mutex<Option<usize>>,
    updates: Mutex<Vec<(usize, usize)>>,
}

impl ProgressReporter for RecordingProgress {
    fn on_start(&self, total: usize) {
        *self.started.lock().unwrap() = Some(total);
    }

    fn on_progress(&self, processed: usize, total: usize) {
        self.updates.lock().unwrap().push((processed, total));
    }
}

fn run_with(directory: FakeDirectory, metrics: FakeMetrics) -> ClassificationRun {
    ClassificationRun::new(Arc::new(directory), Arc::new(metrics), RunConfig::default())
}

#[tokio::test]
async fn test_mixed_fleet_is_partitioned() {
    let directory = FakeDirectory::with_ids(&["i-idle", "i-stuck", "i-busy", "i-new"]);
    let metrics = FakeMetrics::default()
        .with("i-idle", vec![0.0; 18])
        .with("i-stuck", vec![25.0; 18])
        .with("i-busy", (0..18).map(|i| if i % 2 == 0 { 20.0 } else { 80.0 }).collect())
        .with("i-new", vec![30.0, 40.0]);

    let results = run_with(directory, metrics)
        .execute(&InstanceFilter::new("worker"), Arc::new(NoProgress))
        .await
        .unwrap();

    assert_eq!(results.total(), 4);

    let bad: Vec<(&str, Option<Reason>)> = results
        .bad
        .iter()
        .map(|r| (r.instance.id.as_str(), r.reason()))
        .collect();
    assert_eq!(
        bad,
        vec![
            ("i-idle", Some(Reason::LowCpu)),
            ("i-stuck", Some(Reason::FlatlinedCpu)),
        ]
    );
    assert_eq!(results.good.len(), 1);
    assert_eq!(results.good[0].instance.id, "i-busy");
    assert_eq!(results.good[0].score(), 80.0);
    assert_eq!(results.unknown.len(), 1);
    assert_eq!(results.unknown[0].instance.id, "i-new");
}

#[tokio::test]
async fn test_fetch_failures_map_to_unknown() {
    let ids: Vec<String> = (0..20).map(|i| format!("i-{:02}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let directory = FakeDirectory::with_ids(&id_refs);

    // Every third instance has no series and fails to fetch
    let mut metrics = FakeMetrics::default();
    for (i, id) in ids.iter().enumerate() {
        if i % 3 != 0 {
            metrics = metrics.with(id, vec![50.0, 10.0, 70.0, 5.0, 60.0, 15.0]);
        }
    }
    let failing = ids.iter().enumerate().filter(|(i, _)| i % 3 == 0).count();

    let report = run_with(directory, metrics)
        .execute_detailed(&InstanceFilter::new("worker"), Arc::new(NoProgress))
        .await
        .unwrap();

    assert_eq!(report.results.total(), 20);
    assert_eq!(report.fetch_failures(), failing);
    assert_eq!(report.results.unknown.len(), failing);
    assert_eq!(report.results.good.len(), 20 - failing);

    let mut seen: Vec<&str> = [Bucket::Bad, Bucket::Good, Bucket::Unknown]
        .iter()
        .flat_map(|b| report.results.get(*b))
        .map(|r| r.instance.id.as_str())
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 20);

    assert!(report.results.unknown.iter().all(|r| matches!(
        r.classification,
        Classification::Unknown {
            cause: UnknownCause::FetchFailed { .. }
        }
    )));
}

#[tokio::test]
async fn test_empty_listing_is_success() {
    let metrics = FakeMetrics::default();
    let results = run_with(FakeDirectory::with_ids(&[]), metrics)
        .execute(&InstanceFilter::new("nothing"), Arc::new(NoProgress))
        .await
        .unwrap();

    assert!(results.bad.is_empty());
    assert!(results.good.is_empty());
    assert!(results.unknown.is_empty());
}

#[tokio::test]
async fn test_directory_failure_is_fatal() {
    let metrics = Arc::new(FakeMetrics::default().with("i-1", vec![0.0; 6]));
    let run = ClassificationRun::new(
        Arc::new(FakeDirectory::failing()),
        metrics.clone(),
        RunConfig::default(),
    );

    let err = run
        .execute(&InstanceFilter::new("worker"), Arc::new(NoProgress))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Directory(ProviderError::Directory(_))));
    assert_eq!(metrics.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_progress_counts_every_instance() {
    let directory = FakeDirectory::with_ids(&["a", "b", "c", "d", "e"]);
    let metrics = FakeMetrics::default()
        .with("a", vec![0.0; 6])
        .with("b", vec![0.0; 6])
        .with("c", vec![0.0; 6]);
    let progress = Arc::new(RecordingProgress::default());

    run_with(directory, metrics)
        .execute(&InstanceFilter::new("worker"), progress.clone())
        .await
        .unwrap();

    assert_eq!(*progress.started.lock().unwrap(), Some(5));
    let mut updates = progress.updates.lock().unwrap().clone();
    updates.sort();
    assert_eq!(updates, vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
}

#[tokio::test]
async fn test_filter_passed_through_unmodified() {
    let directory = Arc::new(FakeDirectory::with_ids(&[]));
    let run = ClassificationRun::new(
        directory.clone(),
        Arc::new(FakeMetrics::default()),
        RunConfig::default(),
    );
    let filter = InstanceFilter::new("batch-worker")
        .with_security_group(Some("sg-workers".into()))
        .with_network_mode(NetworkMode::Classic);

    run.execute(&filter, Arc::new(NoProgress)).await.unwrap();

    let seen = directory.filters.lock().unwrap();
    assert_eq!(seen.as_slice(), &[filter]);
}

#[tokio::test]
async fn test_duplicate_listing_entries_classified_once() {
    let directory = FakeDirectory::with_ids(&["i-1", "i-1", "i-2"]);
    let metrics = FakeMetrics::default()
        .with("i-1", vec![0.0; 6])
        .with("i-2", vec![0.0; 6]);

    let results = run_with(directory, metrics)
        .execute(&InstanceFilter::new("worker"), Arc::new(NoProgress))
        .await
        .unwrap();

    assert_eq!(results.total(), 2);
    assert_eq!(results.bad.len(), 2);
}

#[tokio::test]
async fn test_custom_thresholds_flow_into_classifier() {
    let directory = FakeDirectory::with_ids(&["i-1"]);
    let metrics = FakeMetrics::default().with("i-1", vec![3.0, 4.0]);
    let config = RunConfig {
        concurrency: 1,
        classifier: ClassifierConfig {
            min_samples: 2,
            bad_max_threshold: 5.0,
            ..ClassifierConfig::default()
        },
        ..RunConfig::default()
    };
    let run = ClassificationRun::new(Arc::new(directory), Arc::new(metrics), config);

    let results = run
        .execute(&InstanceFilter::new("worker"), Arc::new(NoProgress))
        .await
        .unwrap();
    assert_eq!(results.bad.len(), 1);
    assert_eq!(results.bad[0].reason(), Some(Reason::LowCpu));
}
