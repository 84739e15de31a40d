//! Route53 hosted zones and record sets.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_route53::Client;
use aws_sdk_route53::error::ProvideErrorMetadata;
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::provider::traits::Dns;
use crate::provider::types::{HostedZone, RecordSet};

use super::request_error;

const SERVICE: &str = "route53";

/// TTL for certificate validation records.
const VALIDATION_RECORD_TTL: i64 = 300;

const ZONE_ID_PREFIX: &str = "/hostedzone/";

/// Route53-backed [`Dns`].
#[derive(Debug, Clone)]
pub struct Route53Dns {
    client: Client,
}

impl Route53Dns {
    /// Creates the Route53 client.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn change(
        &self,
        zone_id: &str,
        action: ChangeAction,
        record: &RecordSet,
    ) -> std::result::Result<(), aws_sdk_route53::Error> {
        let change = Change::builder()
            .action(action)
            .resource_record_set(resource_record_set(record)?)
            .build()?;
        let batch = ChangeBatch::builder().changes(change).build()?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await?;
        Ok(())
    }
}

fn resource_record_set(
    record: &RecordSet,
) -> std::result::Result<ResourceRecordSet, aws_sdk_route53::error::BuildError> {
    match record {
        RecordSet::Simple(simple) => ResourceRecordSet::builder()
            .name(&simple.name)
            .r#type(RrType::from(simple.record_type.as_str()))
            .ttl(VALIDATION_RECORD_TTL)
            .resource_records(ResourceRecord::builder().value(&simple.value).build()?)
            .build(),
        RecordSet::Alias { name, target } => ResourceRecordSet::builder()
            .name(name)
            .r#type(RrType::from("A"))
            .alias_target(
                AliasTarget::builder()
                    .hosted_zone_id(&target.hosted_zone_id)
                    .dns_name(&target.dns_name)
                    .evaluate_target_health(false)
                    .build()?,
            )
            .build(),
    }
}

#[async_trait]
impl Dns for Route53Dns {
    async fn find_zone(&self, name: &str) -> Result<Option<HostedZone>> {
        let output = self
            .client
            .list_hosted_zones_by_name()
            .dns_name(name)
            .max_items(1)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "ListHostedZonesByName", e))?;

        Ok(output
            .hosted_zones()
            .iter()
            .find(|zone| zone.name().trim_end_matches('.').eq_ignore_ascii_case(name))
            .map(|zone| HostedZone {
                id: zone.id().trim_start_matches(ZONE_ID_PREFIX).to_string(),
                name: zone.name().trim_end_matches('.').to_string(),
            }))
    }

    async fn upsert_record_set(&self, zone_id: &str, record: &RecordSet) -> Result<()> {
        self.change(zone_id, ChangeAction::from("UPSERT"), record)
            .await
            .map_err(|e| request_error(SERVICE, "ChangeResourceRecordSets", e))?;
        debug!("Upserted {} in zone {zone_id}", record.name());
        Ok(())
    }

    async fn delete_record_set(&self, zone_id: &str, record: &RecordSet) -> Result<()> {
        match self.change(zone_id, ChangeAction::from("DELETE"), record).await {
            Ok(()) => Ok(()),
            // Deleting a record that is already gone is rejected as an invalid batch
            Err(e)
                if e.code() == Some("InvalidChangeBatch")
                    && e.message().is_some_and(|m| m.contains("not found")) =>
            {
                Err(ProviderError::NotFound {
                    resource: String::from("Route53 record"),
                    id: record.name().to_string(),
                }
                .into())
            }
            Err(e) => Err(request_error(SERVICE, "ChangeResourceRecordSets", e)),
        }
    }
}
