//! Core data models for the idle-instance sweep

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel CPU value displayed for instances that could not be judged
pub const UNKNOWN_CPU_PERCENT: f64 = -1.0;

/// A compute instance returned by the instance directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRef {
    pub id: String,
    pub host: Option<String>,
}

impl InstanceRef {
    pub fn new(id: impl Into<String>, host: Option<String>) -> Self {
        Self {
            id: id.into(),
            host: host.filter(|h| !h.is_empty()),
        }
    }

    /// Display label: `<id> - <host>`
    pub fn label(&self) -> String {
        format!("{} - {}", self.id, self.host.as_deref().unwrap_or(""))
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// One averaged CPU datapoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub average: f64,
}

/// Average-CPU time series for one instance over the lookback window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub samples: Vec<Sample>,
}

impl TimeSeries {
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self { samples }
    }

    /// Build a series from bare values spaced one minute apart
    pub fn from_values(values: &[f64]) -> Self {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, v)| Sample {
                timestamp: start + chrono::Duration::minutes(i as i64),
                average: *v,
            })
            .collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.average)
    }
}

/// Why an instance was judged idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// CPU never rose meaningfully above zero
    LowCpu,
    /// CPU pinned at a constant non-zero level
    FlatlinedCpu,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::LowCpu => "Low CPU",
            Reason::FlatlinedCpu => "Flatlined CPU",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an instance could not be judged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnknownCause {
    /// Fewer datapoints than the minimum required
    InsufficientSamples { count: usize },
    /// The metrics provider failed for this instance
    FetchFailed { error: String },
}

impl fmt::Display for UnknownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownCause::InsufficientSamples { count } => write!(f, "{} samples", count),
            UnknownCause::FetchFailed { .. } => f.write_str("fetch failed"),
        }
    }
}

/// Outcome of classifying one time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "classification", rename_all = "snake_case")]
pub enum Classification {
    Good { max: f64 },
    Bad { reason: Reason, score: f64 },
    Unknown { cause: UnknownCause },
}

impl Classification {
    /// Statistic shown next to the instance: max, stddev, or the unknown sentinel
    pub fn score(&self) -> f64 {
        match self {
            Classification::Good { max } => *max,
            Classification::Bad { score, .. } => *score,
            Classification::Unknown { .. } => UNKNOWN_CPU_PERCENT,
        }
    }

    pub fn reason(&self) -> Option<Reason> {
        match self {
            Classification::Bad { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Classification::Good { .. } => Bucket::Good,
            Classification::Bad { .. } => Bucket::Bad,
            Classification::Unknown { .. } => Bucket::Unknown,
        }
    }
}

/// One of the three disjoint result collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Bad,
    Good,
    Unknown,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Bad => "bad",
            Bucket::Good => "good",
            Bucket::Unknown => "unknown",
        }
    }
}

/// Classification of one instance, produced once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub instance: InstanceRef,
    #[serde(flatten)]
    pub classification: Classification,
}

impl ClassificationResult {
    pub fn new(instance: InstanceRef, classification: Classification) -> Self {
        Self {
            instance,
            classification,
        }
    }

    pub fn score(&self) -> f64 {
        self.classification.score()
    }

    pub fn reason(&self) -> Option<Reason> {
        self.classification.reason()
    }
}

/// Network placement used to pick the security-group filter field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Classic,
    #[default]
    Vpc,
}

/// Filter handed to the instance directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFilter {
    pub name_tag: String,
    pub running_only: bool,
    pub security_group: Option<String>,
    pub network_mode: NetworkMode,
}

impl InstanceFilter {
    pub fn new(name_tag: impl Into<String>) -> Self {
        Self {
            name_tag: name_tag.into(),
            running_only: true,
            security_group: None,
            network_mode: NetworkMode::default(),
        }
    }

    /// Blank or whitespace-only groups are treated as absent
    pub fn with_security_group(mut self, group: Option<String>) -> Self {
        self.security_group = group
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());
        self
    }

    pub fn with_network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = mode;
        self
    }
}

/// Destructive action applied to bad instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationAction {
    Terminate,
    Reboot,
}

impl RemediationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationAction::Terminate => "terminate",
            RemediationAction::Reboot => "reboot",
        }
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
