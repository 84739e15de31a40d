//! Deleting what a deployment created.
//!
//! Tracked resources are deleted in the reverse of the order they were
//! created. Each deletion stands alone: a failure is logged and the next
//! resource is still attempted. The record is rewritten after every deletion,
//! so running teardown again retries only what is left.

use serde::Serialize;
use std::fmt::Write as _;
use tracing::{info, warn};

use crate::config::{ConfigValidator, DeployConfig};
use crate::confirm::ConfirmationGate;
use crate::error::{ProviderError, ProvisionError, Result, SpaDeployError};
use crate::poller::{Readiness, wait_until};
use crate::provider::{Cdn, Providers, RecordSet};
use crate::state::{DeploymentState, ResourceKind, StateStore};

/// How a teardown run ended.
#[derive(Debug)]
pub enum TeardownOutcome {
    /// Every tracked resource is gone and the record was removed.
    Completed(TeardownReport),
    /// There was no record, so nothing is known to exist.
    NothingToDo,
    /// The user declined the confirmation prompt.
    Cancelled,
}

/// What a completed teardown deleted.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    /// Bucket the deployment used.
    pub bucket: String,
    /// Resources deleted by this run, in order.
    pub deleted: Vec<ResourceKind>,
    /// Resources that were already gone.
    pub already_gone: Vec<ResourceKind>,
}

/// Deletes tracked resources.
pub struct TeardownOrchestrator<'a> {
    config: &'a DeployConfig,
    providers: &'a Providers,
    store: &'a dyn StateStore,
    gate: &'a dyn ConfirmationGate,
}

enum Deletion {
    Deleted,
    AlreadyGone,
}

impl<'a> TeardownOrchestrator<'a> {
    /// Creates an orchestrator.
    #[must_use]
    pub const fn new(
        config: &'a DeployConfig,
        providers: &'a Providers,
        store: &'a dyn StateStore,
        gate: &'a dyn ConfirmationGate,
    ) -> Self {
        Self {
            config,
            providers,
            store,
            gate,
        }
    }

    /// Deletes every tracked resource, then the record.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::TeardownIncomplete`] listing what is still
    /// tracked if any deletion failed, or a state or configuration error.
    pub async fn run(&self) -> Result<TeardownOutcome> {
        let Some(mut state) = self.store.load().await? else {
            info!("No deployment record at {}", self.store.location());
            return Ok(TeardownOutcome::NothingToDo);
        };
        ConfigValidator::check_identity(self.config, &state)?;

        let order: Vec<ResourceKind> = state.created_resources.iter().rev().copied().collect();
        if !order.is_empty()
            && !self
                .gate
                .confirm(&confirmation_prompt(&state.bucket_name, &order))?
        {
            info!("Teardown cancelled");
            return Ok(TeardownOutcome::Cancelled);
        }

        let mut report = TeardownReport {
            bucket: state.bucket_name.clone(),
            deleted: Vec::new(),
            already_gone: Vec::new(),
        };

        for kind in order {
            info!("Deleting {}", kind.description());
            match self.delete(kind, &state).await {
                Ok(Deletion::Deleted) => report.deleted.push(kind),
                Ok(Deletion::AlreadyGone) => {
                    info!("{} was already deleted", kind.description());
                    report.already_gone.push(kind);
                }
                Err(e) => {
                    warn!("Failed to delete {}: {e}", kind.description());
                    continue;
                }
            }

            state.untrack(kind);
            forget(&mut state, kind);
            state.touch();
            self.store.save(&state).await?;
        }

        if !state.is_drained() {
            return Err(ProvisionError::TeardownIncomplete {
                remaining: state.created_resources,
            }
            .into());
        }

        self.store.delete().await?;
        info!("Teardown complete");
        Ok(TeardownOutcome::Completed(report))
    }

    async fn delete(&self, kind: ResourceKind, state: &DeploymentState) -> Result<Deletion> {
        let result = match kind {
            ResourceKind::Route53AliasRecord => {
                let zone_id = required(state.route53_zone_id.as_ref(), "hosted zone ID")?;
                let domain = required(state.domain.as_ref(), "domain")?;
                let target = required(state.cloudfront_domain.as_ref(), "distribution domain")?;
                self.providers
                    .dns
                    .delete_record_set(zone_id, &RecordSet::distribution_alias(domain, target))
                    .await
            }
            ResourceKind::Route53ValidationRecord => {
                let zone_id = required(state.route53_zone_id.as_ref(), "hosted zone ID")?;
                let record = state.acm_validation_record.clone().ok_or_else(|| {
                    SpaDeployError::internal("deployment record has no validation record")
                })?;
                self.providers
                    .dns
                    .delete_record_set(zone_id, &RecordSet::Simple(record))
                    .await
            }
            ResourceKind::CloudFrontDistribution => {
                let id = required(state.cloudfront_distribution_id.as_ref(), "distribution ID")?;
                self.delete_distribution(id).await
            }
            ResourceKind::CloudFrontOac => {
                let id = required(state.cloudfront_oac_id.as_ref(), "origin access control")?;
                self.providers.cdn.delete_origin_access_control(id).await
            }
            ResourceKind::AcmCertificate => {
                let arn = required(state.acm_certificate_arn.as_ref(), "certificate ARN")?;
                self.providers.certificates.delete_certificate(arn).await
            }
            ResourceKind::S3Bucket => self.delete_bucket(&state.bucket_name).await,
        };

        match result {
            Ok(()) => Ok(Deletion::Deleted),
            Err(SpaDeployError::Provider(ProviderError::NotFound { .. })) => {
                Ok(Deletion::AlreadyGone)
            }
            Err(e) => Err(e),
        }
    }

    /// A distribution can only be deleted once it is disabled and deployed.
    async fn delete_distribution(&self, id: &str) -> Result<()> {
        let cdn: &dyn Cdn = self.providers.cdn.as_ref();

        cdn.disable_distribution(id).await?;
        info!(
            "Waiting for distribution {id} to finish disabling (this usually takes several minutes)"
        );
        wait_until(
            &format!("distribution {id} to disable"),
            &self.config.polling.distribution,
            move || async move {
                let info = cdn.get_distribution(id).await?;
                if !info.enabled && info.is_deployed() {
                    Ok(Readiness::Ready(()))
                } else {
                    Ok(Readiness::Pending(info.status))
                }
            },
        )
        .await?;

        cdn.delete_distribution(id).await
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let storage = self.providers.storage.as_ref();
        let removed = storage.delete_all_versions(bucket).await?;
        info!("Removed {removed} object versions from {bucket}");
        storage.delete_bucket(bucket).await
    }
}

fn required<'s>(value: Option<&'s String>, field: &str) -> Result<&'s str> {
    value
        .map(String::as_str)
        .ok_or_else(|| SpaDeployError::internal(format!("deployment record has no {field}")))
}

/// Clears the identifiers of a deleted resource.
fn forget(state: &mut DeploymentState, kind: ResourceKind) {
    match kind {
        ResourceKind::S3Bucket => state.s3_website_url = None,
        ResourceKind::CloudFrontOac => state.cloudfront_oac_id = None,
        ResourceKind::CloudFrontDistribution => {
            state.cloudfront_distribution_id = None;
            state.cloudfront_arn = None;
            state.cloudfront_certificate_arn = None;
            // The alias record can only be deleted with its exact target.
            if !state.tracks(ResourceKind::Route53AliasRecord) {
                state.cloudfront_domain = None;
            }
        }
        ResourceKind::AcmCertificate => state.acm_certificate_arn = None,
        ResourceKind::Route53ValidationRecord => state.acm_validation_record = None,
        ResourceKind::Route53AliasRecord => {
            state.domain = None;
            if state.cloudfront_distribution_id.is_none() {
                state.cloudfront_domain = None;
            }
        }
    }
}

fn confirmation_prompt(bucket: &str, kinds: &[ResourceKind]) -> String {
    let mut prompt = format!("The following resources created for s3://{bucket} will be deleted:");
    for kind in kinds {
        let _ = write!(prompt, "\n  - {}", kind.description());
    }
    prompt.push_str("\nContinue?");
    prompt
}
