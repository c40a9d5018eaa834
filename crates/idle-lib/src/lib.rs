//! Idle-instance detection library
//!
//! This crate provides the core functionality for:
//! - Bounded-parallelism fan-out over a fleet
//! - CPU time-series sampling and idle/flatlined classification
//! - Concurrent aggregation into Bad / Good / Unknown buckets
//! - Serialized remediation (terminate / reboot) of bad instances
//! - EC2 and CloudWatch adapters, metrics and structured logging

pub mod aggregator;
pub mod aws;
pub mod classifier;
pub mod error;
pub mod fanout;
pub mod models;
pub mod observability;
pub mod provider;
pub mod remediation;
pub mod run;
pub mod sampler;

pub use aggregator::{ResultAggregator, ResultSet};
pub use classifier::{classify, ClassifierConfig, SeriesStats};
pub use error::{ProviderError, RunError};
pub use fanout::{BoundedFanOut, FanOutReport, ItemOutcome};
pub use models::*;
pub use observability::{StructuredLogger, SweepMetrics};
pub use remediation::{RemediationExecutor, RemediationOutcome, RemediationReport};
pub use run::{ClassificationRun, NoProgress, ProgressReporter, RunConfig, RunReport};
pub use sampler::MetricSampler;
