//! Concurrent accumulation of classification results
//!
//! Workers record into three append-only buckets keyed by instance id.
//! A shared counter tracks how many instances have been processed so
//! progress can be reported without recounting the buckets.

use crate::models::{Bucket, ClassificationResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe collector for one run
#[derive(Debug, Default)]
pub struct ResultAggregator {
    bad: DashMap<String, ClassificationResult>,
    good: DashMap<String, ClassificationResult>,
    unknown: DashMap<String, ClassificationResult>,
    /// Bucket each recorded instance landed in
    index: DashMap<String, Bucket>,
    processed: AtomicUsize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, bucket: Bucket) -> &DashMap<String, ClassificationResult> {
        match bucket {
            Bucket::Bad => &self.bad,
            Bucket::Good => &self.good,
            Bucket::Unknown => &self.unknown,
        }
    }

    /// Append a result to its bucket; returns the processed count after this one.
    ///
    /// A second result for an instance already recorded is ignored and does
    /// not advance the counter.
    pub fn record(&self, result: ClassificationResult) -> usize {
        let bucket = result.classification.bucket();
        match self.index.entry(result.instance.id.clone()) {
            Entry::Occupied(_) => return self.processed(),
            Entry::Vacant(slot) => {
                slot.insert(bucket);
            }
        }
        self.bucket(bucket).insert(result.instance.id.clone(), result);
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.index.contains_key(instance_id)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Copy out the three buckets, each ordered by instance id
    pub fn snapshot(&self) -> ResultSet {
        ResultSet {
            bad: collect_sorted(&self.bad),
            good: collect_sorted(&self.good),
            unknown: collect_sorted(&self.unknown),
        }
    }
}

fn collect_sorted(map: &DashMap<String, ClassificationResult>) -> Vec<ClassificationResult> {
    let mut items: Vec<ClassificationResult> = map.iter().map(|e| e.value().clone()).collect();
    items.sort_by(|a, b| a.instance.id.cmp(&b.instance.id));
    items
}

/// The three disjoint result buckets of a completed run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub bad: Vec<ClassificationResult>,
    pub good: Vec<ClassificationResult>,
    pub unknown: Vec<ClassificationResult>,
}

impl ResultSet {
    pub fn total(&self) -> usize {
        self.bad.len() + self.good.len() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn get(&self, bucket: Bucket) -> &[ClassificationResult] {
        match bucket {
            Bucket::Bad => &self.bad,
            Bucket::Good => &self.good,
            Bucket::Unknown => &self.unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, InstanceRef, Reason, UnknownCause};
    use std::sync::Arc;

    fn result(id: &str, classification: Classification) -> ClassificationResult {
        ClassificationResult::new(InstanceRef::new(id, None), classification)
    }

    #[test]
    fn test_routes_to_matching_bucket() {
        let agg = ResultAggregator::new();
        agg.record(result("i-good", Classification::Good { max: 40.0 }));
        agg.record(result(
            "i-bad",
            Classification::Bad {
                reason: Reason::LowCpu,
                score: 0.2,
            },
        ));
        agg.record(result(
            "i-unknown",
            Classification::Unknown {
                cause: UnknownCause::InsufficientSamples { count: 1 },
            },
        ));

        let set = agg.snapshot();
        assert_eq!(set.good.len(), 1);
        assert_eq!(set.bad.len(), 1);
        assert_eq!(set.unknown.len(), 1);
        assert_eq!(set.bad[0].instance.id, "i-bad");
        assert_eq!(agg.processed(), 3);
    }

    #[test]
    fn test_duplicate_record_ignored() {
        let agg = ResultAggregator::new();
        assert_eq!(agg.record(result("i-1", Classification::Good { max: 9.0 })), 1);
        assert_eq!(
            agg.record(result(
                "i-1",
                Classification::Bad {
                    reason: Reason::LowCpu,
                    score: 0.0
                }
            )),
            1
        );
        let set = agg.snapshot();
        assert_eq!(set.total(), 1);
        assert!(set.bad.is_empty());
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let agg = Arc::new(ResultAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let classification = if i % 2 == 0 {
                            Classification::Good { max: 50.0 }
                        } else {
                            Classification::Bad {
                                reason: Reason::FlatlinedCpu,
                                score: 0.01,
                            }
                        };
                        agg.record(result(&format!("i-{}-{}", worker, i), classification));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let set = agg.snapshot();
        assert_eq!(agg.processed(), 2000);
        assert_eq!(set.total(), 2000);
        assert_eq!(set.good.len(), 1000);
        assert_eq!(set.bad.len(), 1000);
    }

    #[test]
    fn test_empty_snapshot() {
        let set = ResultAggregator::new().snapshot();
        assert!(set.is_empty());
        assert!(set.get(Bucket::Unknown).is_empty());
    }
}
