//! Settings for the CLI
//!
//! Tunables are layered: built-in defaults, then an optional settings file
//! (`~/.config/find-idle-instances/config.toml` unless `--config` is given),
//! then `FIND_IDLE_*` environment variables. Command-line flags are applied
//! on top by the caller.

use anyhow::{Context, Result};
use idle_lib::aws::DEFAULT_REGION;
use idle_lib::{ClassifierConfig, RunConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved CLI settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// AWS region used when `--region` is absent
    #[serde(default = "default_region")]
    pub region: String,

    /// Concurrent metrics requests
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Trailing window sampled per instance
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u64,

    /// Sampling period of the CPU series
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u64,

    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    #[serde(default = "default_bad_max_threshold")]
    pub bad_max_threshold: f64,

    #[serde(default = "default_stalled_floor")]
    pub stalled_floor: f64,

    #[serde(default = "default_stalled_max_std_dev")]
    pub stalled_max_std_dev: f64,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_concurrency() -> usize {
    RunConfig::default().concurrency
}

fn default_lookback_hours() -> u64 {
    RunConfig::default().lookback.as_secs() / 3600
}

fn default_period_minutes() -> u64 {
    RunConfig::default().period.as_secs() / 60
}

fn default_min_samples() -> usize {
    ClassifierConfig::default().min_samples
}

fn default_bad_max_threshold() -> f64 {
    ClassifierConfig::default().bad_max_threshold
}

fn default_stalled_floor() -> f64 {
    ClassifierConfig::default().stalled_floor
}

fn default_stalled_max_std_dev() -> f64 {
    ClassifierConfig::default().stalled_max_std_dev
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: default_region(),
            concurrency: default_concurrency(),
            lookback_hours: default_lookback_hours(),
            period_minutes: default_period_minutes(),
            min_samples: default_min_samples(),
            bad_max_threshold: default_bad_max_threshold(),
            stalled_floor: default_stalled_floor(),
            stalled_max_std_dev: default_stalled_max_std_dev(),
        }
    }
}

impl Settings {
    /// Load settings; an explicit path must exist, the default one may not
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("FIND_IDLE").try_parsing(true))
            .build()
            .context("Failed to load settings")?;

        settings
            .try_deserialize()
            .context("Failed to parse settings")
    }

    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| {
            home.join(".config")
                .join("find-idle-instances")
                .join("config.toml")
        })
    }

    /// Run configuration, with an optional concurrency override
    pub fn run_config(&self, concurrency: Option<usize>) -> RunConfig {
        RunConfig {
            concurrency: concurrency.unwrap_or(self.concurrency).max(1),
            lookback: Duration::from_secs(self.lookback_hours * 3600),
            period: Duration::from_secs(self.period_minutes * 60),
            classifier: ClassifierConfig {
                min_samples: self.min_samples,
                bad_max_threshold: self.bad_max_threshold,
                stalled_floor: self.stalled_floor,
                stalled_max_std_dev: self.stalled_max_std_dev,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_match_library() {
        let settings = Settings::default();
        assert_eq!(settings.run_config(None), RunConfig::default());
        assert_eq!(settings.region, "us-east-1");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = settings_file(
            r#"
region = "eu-west-1"
concurrency = 4
stalled_max_std_dev = 0.1
"#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.stalled_max_std_dev, 0.1);
        assert_eq!(settings.min_samples, 6);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_concurrency_override_and_clamp() {
        let settings = Settings::default();
        assert_eq!(settings.run_config(Some(2)).concurrency, 2);
        assert_eq!(settings.run_config(Some(0)).concurrency, 1);
    }

    #[test]
    fn test_window_conversion() {
        let settings = Settings {
            lookback_hours: 6,
            period_minutes: 5,
            ..Settings::default()
        };
        let run = settings.run_config(None);
        assert_eq!(run.lookback, Duration::from_secs(6 * 3600));
        assert_eq!(run.period, Duration::from_secs(300));
    }
}
