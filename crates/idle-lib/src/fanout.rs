//! Bounded-parallelism fan-out
//!
//! Splits a batch across a fixed number of workers. Each worker walks its
//! own partition sequentially; workers run concurrently. A failing (or
//! panicking) item is recorded in the report and never aborts the batch.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Result of the action for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed { reason: String },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded)
    }
}

/// Per-item outcomes, in input order
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl FanOutReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Input positions of the failed items with their reasons
    pub fn failures(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.outcomes.iter().enumerate().filter_map(|(i, o)| match o {
            ItemOutcome::Failed { reason } => Some((i, reason.as_str())),
            ItemOutcome::Succeeded => None,
        })
    }
}

/// Runs an async action over a batch with at most `concurrency` in flight
#[derive(Debug, Clone, Copy)]
pub struct BoundedFanOut {
    concurrency: usize,
}

impl BoundedFanOut {
    /// A concurrency of zero is treated as one
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process every item and return once all of them are accounted for
    pub async fn run<T, F, Fut, E>(&self, items: Vec<T>, action: F) -> FanOutReport
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            return FanOutReport::default();
        }

        let partitions = partition(items, self.concurrency);
        debug!(
            items = total,
            workers = partitions.len(),
            "Starting bounded fan-out"
        );

        let action = Arc::new(action);
        let mut workers = JoinSet::new();

        for part in partitions {
            let action = Arc::clone(&action);
            workers.spawn(async move {
                let mut done = Vec::with_capacity(part.len());
                for (index, item) in part {
                    // Own task per item so a panic is contained to that item
                    let outcome = match tokio::spawn((*action)(item)).await {
                        Ok(Ok(())) => ItemOutcome::Succeeded,
                        Ok(Err(e)) => {
                            warn!(item = index, error = %e, "Fan-out item failed");
                            ItemOutcome::Failed {
                                reason: e.to_string(),
                            }
                        }
                        Err(e) => {
                            warn!(item = index, error = %e, "Fan-out item panicked");
                            ItemOutcome::Failed {
                                reason: format!("task aborted: {}", e),
                            }
                        }
                    };
                    done.push((index, outcome));
                }
                done
            });
        }

        let mut outcomes: Vec<Option<ItemOutcome>> = vec![None; total];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(done) => {
                    for (index, outcome) in done {
                        outcomes[index] = Some(outcome);
                    }
                }
                Err(e) => warn!(error = %e, "Fan-out worker aborted"),
            }
        }

        FanOutReport {
            outcomes: outcomes
                .into_iter()
                .map(|o| {
                    o.unwrap_or_else(|| ItemOutcome::Failed {
                        reason: "worker aborted".to_string(),
                    })
                })
                .collect(),
        }
    }
}

/// Interleave items across `workers` partitions, keeping input positions
fn partition<T>(items: Vec<T>, workers: usize) -> Vec<Vec<(usize, T)>> {
    let workers = workers.min(items.len()).max(1);
    let mut parts: Vec<Vec<(usize, T)>> = (0..workers).map(|_| Vec::new()).collect();
    for (index, item) in items.into_iter().enumerate() {
        parts[index % workers].push((index, item));
    }
    parts
}
