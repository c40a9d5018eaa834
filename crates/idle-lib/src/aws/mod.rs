//! AWS implementations of the collaborator traits
//!
//! EC2 backs the instance directory and the remediation calls; CloudWatch
//! backs the metrics provider. Clients are built from explicit static
//! credentials and a region.

mod cloudwatch;
mod ec2;

pub use cloudwatch::CloudWatchMetrics;
pub use ec2::{ec2_filters, Ec2Fleet};

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use std::fmt;
use tracing::info;

/// Region used when none is supplied
pub const DEFAULT_REGION: &str = "us-east-1";

/// Credentials and region for one invocation
#[derive(Clone)]
pub struct AwsSettings {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

impl AwsSettings {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: Option<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        }
    }

    /// Shared SDK configuration for the EC2 and CloudWatch clients
    pub async fn sdk_config(&self) -> SdkConfig {
        let credentials = Credentials::new(
            &self.access_key,
            &self.secret_key,
            None,
            None,
            "find-idle-instances-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        info!(region = %self.region, "AWS clients configured");
        config
    }
}

impl fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSettings")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}
