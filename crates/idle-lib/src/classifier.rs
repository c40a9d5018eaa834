//! Idle-instance classification
//!
//! Turns an average-CPU time series into Good / Bad / Unknown. An instance
//! is Bad when its CPU never rose above a small threshold (low CPU), or
//! when it sits above a floor with almost no variation (flatlined CPU, the
//! signature of a stuck busy loop).

use crate::models::{Classification, Reason, TimeSeries, UnknownCause};
use serde::{Deserialize, Serialize};

/// Minimum datapoints before a series is judged (60 minutes at 10-minute periods)
const DEFAULT_MIN_SAMPLES: usize = 6;

/// Max CPU percent below which an instance is idle
const DEFAULT_BAD_MAX_THRESHOLD: f64 = 1.0;

/// Max CPU percent above which a flat series counts as stuck
const DEFAULT_STALLED_FLOOR: f64 = 5.0;

/// Standard deviation (percentage points) below which a series is flat
const DEFAULT_STALLED_MAX_STD_DEV: f64 = 0.05;

/// Thresholds for the classification rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub min_samples: usize,
    pub bad_max_threshold: f64,
    pub stalled_floor: f64,
    pub stalled_max_std_dev: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            bad_max_threshold: DEFAULT_BAD_MAX_THRESHOLD,
            stalled_floor: DEFAULT_STALLED_FLOOR,
            stalled_max_std_dev: DEFAULT_STALLED_MAX_STD_DEV,
        }
    }
}

/// Summary statistics of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation (divides by `count`)
    pub std_dev: f64,
}

impl SeriesStats {
    /// Returns `None` for an empty series
    pub fn compute(series: &TimeSeries) -> Option<Self> {
        if series.is_empty() {
            return None;
        }

        let count = series.len();
        let max = series.values().fold(f64::NEG_INFINITY, f64::max);
        let mean = series.values().sum::<f64>() / count as f64;

        // Two-pass variance
        let variance = series.values().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Self {
            count,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// Classify a series with the given thresholds
pub fn classify(series: &TimeSeries, config: &ClassifierConfig) -> Classification {
    if series.len() < config.min_samples {
        return insufficient(series.len());
    }

    let Some(stats) = SeriesStats::compute(series) else {
        return insufficient(0);
    };

    if stats.max < config.bad_max_threshold {
        Classification::Bad {
            reason: Reason::LowCpu,
            score: stats.max,
        }
    } else if stats.max > config.stalled_floor && stats.std_dev < config.stalled_max_std_dev {
        Classification::Bad {
            reason: Reason::FlatlinedCpu,
            score: stats.std_dev,
        }
    } else {
        Classification::Good { max: stats.max }
    }
}

fn insufficient(count: usize) -> Classification {
    Classification::Unknown {
        cause: UnknownCause::InsufficientSamples { count },
    }
}
