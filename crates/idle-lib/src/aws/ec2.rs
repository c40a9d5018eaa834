//! EC2 instance directory and remediation calls

use crate::error::ProviderError;
use crate::models::{InstanceFilter, InstanceRef, NetworkMode};
use crate::provider::{async_trait, InstanceDirectory, RemediationProvider};
use aws_config::SdkConfig;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client;
use tracing::{debug, warn};

/// EC2-backed directory and remediation provider
#[derive(Clone)]
pub struct Ec2Fleet {
    client: Client,
}

impl Ec2Fleet {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

/// `DescribeInstances` filters for an instance filter
pub fn ec2_filters(filter: &InstanceFilter) -> Vec<Filter> {
    let mut filters = vec![Filter::builder()
        .name("tag:Name")
        .values(&filter.name_tag)
        .build()];

    if filter.running_only {
        filters.push(
            Filter::builder()
                .name("instance-state-name")
                .values("running")
                .build(),
        );
    }

    if let Some(group) = &filter.security_group {
        let field = match filter.network_mode {
            NetworkMode::Classic => "group-name",
            NetworkMode::Vpc => "instance.group-name",
        };
        filters.push(Filter::builder().name(field).values(group).build());
    }

    filters
}

#[async_trait]
impl InstanceDirectory for Ec2Fleet {
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
    ) -> Result<Vec<InstanceRef>, ProviderError> {
        let response = self
            .client
            .describe_instances()
            .set_filters(Some(ec2_filters(filter)))
            .send()
            .await
            .map_err(|e| ProviderError::Directory(DisplayErrorContext(&e).to_string()))?;

        if response.next_token().is_some() {
            warn!(
                name_tag = %filter.name_tag,
                "More instances matched than fit in one page; only the first page is classified"
            );
        }

        let instances: Vec<InstanceRef> = response
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(|i| {
                i.instance_id().map(|id| {
                    InstanceRef::new(id, i.public_dns_name().map(str::to_string))
                })
            })
            .collect();

        debug!(count = instances.len(), "Listed EC2 instances");
        Ok(instances)
    }
}

#[async_trait]
impl RemediationProvider for Ec2Fleet {
    async fn terminate(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Remediation {
                instance_id: instance_id.to_string(),
                action: "terminate",
                message: DisplayErrorContext(&e).to_string(),
            })
    }

    async fn reboot(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.client
            .reboot_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Remediation {
                instance_id: instance_id.to_string(),
                action: "reboot",
                message: DisplayErrorContext(&e).to_string(),
            })
    }
}
