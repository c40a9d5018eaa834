//! Subcommand implementations

pub mod find;
pub mod remediate;

use crate::config::Settings;
use crate::output::OutputFormat;
use clap::Args;
use idle_lib::aws::{AwsSettings, CloudWatchMetrics, Ec2Fleet};
use idle_lib::{ClassificationRun, InstanceFilter, NetworkMode, RunConfig};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Flags shared by `find`, `terminate` and `reboot`
#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// AWS Access Key (required)
    #[arg(long = "accesskey")]
    pub access_key: Option<String>,

    /// AWS Secret Key (required)
    #[arg(long = "secretkey")]
    pub secret_key: Option<String>,

    /// Name tag of the instances to search on (required)
    #[arg(long)]
    pub name: Option<String>,

    /// AWS region name
    #[arg(long)]
    pub region: Option<String>,

    /// Security group name associated with the instances (recommended)
    #[arg(long = "securityGroup")]
    pub security_group: Option<String>,

    /// Display 'good' instances in results
    #[arg(long = "show-good")]
    pub show_good: bool,

    /// Display 'unknown' instances in results
    #[arg(long = "show-unknown")]
    pub show_unknown: bool,

    /// Look for instances that are not in a VPC
    #[arg(long = "isClassic", alias = "IsClassic")]
    pub is_classic: bool,

    /// Concurrent metrics requests (overrides settings)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Write Prometheus metrics in text format to this file on exit
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

/// Missing required input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("AccessKey is required.")]
    MissingAccessKey,
    #[error("SecretKey is required.")]
    MissingSecretKey,
    #[error("Name is required.")]
    MissingName,
}

/// Everything a sweep needs, resolved from flags and settings
#[derive(Debug, Clone)]
pub struct SweepRequest {
    pub aws: AwsSettings,
    pub filter: InstanceFilter,
    pub run: RunConfig,
    pub show_good: bool,
    pub show_unknown: bool,
    pub format: OutputFormat,
    pub metrics_file: Option<PathBuf>,
}

fn required(value: &Option<String>, err: ValidationError) -> Result<String, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(err)
}

impl SweepArgs {
    /// Check required flags; runs before any settings or network access
    pub fn validate(&self) -> Result<(), ValidationError> {
        required(&self.access_key, ValidationError::MissingAccessKey)?;
        required(&self.secret_key, ValidationError::MissingSecretKey)?;
        required(&self.name, ValidationError::MissingName)?;
        Ok(())
    }

    /// Check required flags and merge with settings
    pub fn resolve(&self, settings: &Settings) -> Result<SweepRequest, ValidationError> {
        let access_key = required(&self.access_key, ValidationError::MissingAccessKey)?;
        let secret_key = required(&self.secret_key, ValidationError::MissingSecretKey)?;
        let name = required(&self.name, ValidationError::MissingName)?;

        let region = self.region.clone().or_else(|| Some(settings.region.clone()));
        let network_mode = if self.is_classic {
            NetworkMode::Classic
        } else {
            NetworkMode::Vpc
        };

        Ok(SweepRequest {
            aws: AwsSettings::new(access_key, secret_key, region),
            filter: InstanceFilter::new(name)
                .with_security_group(self.security_group.clone())
                .with_network_mode(network_mode),
            run: settings.run_config(self.concurrency),
            show_good: self.show_good,
            show_unknown: self.show_unknown,
            format: self.format,
            metrics_file: self.metrics_file.clone(),
        })
    }
}

/// Wire the AWS adapters into a classification run
pub async fn build_run(request: &SweepRequest) -> (ClassificationRun, Arc<Ec2Fleet>) {
    let sdk_config = request.aws.sdk_config().await;
    let fleet = Arc::new(Ec2Fleet::new(&sdk_config));
    let metrics = Arc::new(CloudWatchMetrics::new(&sdk_config));
    let run = ClassificationRun::new(fleet.clone(), metrics, request.run);
    (run, fleet)
}
