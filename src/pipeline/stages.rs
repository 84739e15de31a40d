//! What each stage does.
//!
//! Every executor mutates the in-memory record; the pipeline persists it after
//! the executor returns. Resources found live are reused and recorded, but only
//! resources created here are tracked for teardown.

use tracing::{debug, info};

use crate::error::{ProviderError, Result, SpaDeployError};
use crate::planner::Stage;
use crate::poller::{Readiness, wait_until};
use crate::provider::{
    CertificateAuthority, CertificateStatus, DistributionSpec, PublicAccess, RecordSet,
    bucket_rest_endpoint,
};
use crate::state::{DeploymentState, ResourceKind};
use crate::upload::{collect_uploads, upload_all};
use crate::zone::HostedZoneResolver;

use super::policy;
use super::{ProvisioningPipeline, RunContext};

/// Index document, also served for unknown paths.
const INDEX_DOCUMENT: &str = "index.html";

/// Returns a recorded field, or an internal error naming it.
fn required(value: Option<&String>, field: &str) -> Result<String> {
    value
        .cloned()
        .ok_or_else(|| SpaDeployError::internal(format!("deployment record has no {field}")))
}

impl ProvisioningPipeline<'_> {
    /// Runs one stage and returns a short description of what it did.
    pub(super) async fn execute(
        &self,
        stage: Stage,
        state: &mut DeploymentState,
        run: &mut RunContext,
    ) -> Result<String> {
        match stage {
            Stage::Bucket => self.ensure_bucket(state).await,
            Stage::WebsiteHosting => self.enable_website_hosting(state).await,
            Stage::OriginAccessControl => self.ensure_origin_access_control(state).await,
            Stage::Certificate => self.ensure_certificate(state).await,
            Stage::ValidationRecord => self.publish_validation_record(state).await,
            Stage::CertificateIssued => self.wait_for_issuance(state).await,
            Stage::Distribution => self.ensure_distribution(state).await,
            Stage::DistributionAccess => self.restrict_to_distribution(state).await,
            Stage::AttachCertificate => self.attach_certificate(state).await,
            Stage::Upload => self.upload(run).await,
            Stage::AliasRecord => self.publish_alias(state).await,
            Stage::Invalidation => self.invalidate(state, run).await,
        }
    }

    fn domain(&self) -> Result<&str> {
        self.config
            .mode
            .domain()
            .ok_or_else(|| SpaDeployError::internal("custom domain stage without a domain"))
    }

    async fn ensure_bucket(&self, state: &mut DeploymentState) -> Result<String> {
        let bucket = &self.config.bucket;
        let storage = self.providers.storage.as_ref();

        if storage.bucket_exists(bucket).await? {
            info!("Bucket {bucket} already exists, reusing it");
            return Ok(format!("reused s3://{bucket}"));
        }

        storage.create_bucket(bucket, &self.config.region).await?;
        state.track(ResourceKind::S3Bucket);
        info!("Created bucket {bucket} in {}", self.config.region);
        Ok(format!("created s3://{bucket}"))
    }

    async fn enable_website_hosting(&self, state: &mut DeploymentState) -> Result<String> {
        let bucket = &self.config.bucket;
        let storage = self.providers.storage.as_ref();

        storage
            .set_public_access(bucket, PublicAccess::PublicWebsite)
            .await?;
        storage
            .put_bucket_policy(bucket, &policy::public_read(bucket))
            .await?;
        storage
            .enable_website(bucket, INDEX_DOCUMENT, INDEX_DOCUMENT)
            .await?;

        let url = policy::website_url(bucket, &self.config.region);
        state.s3_website_url = Some(url.clone());
        Ok(url)
    }

    async fn ensure_origin_access_control(&self, state: &mut DeploymentState) -> Result<String> {
        let name = format!("{}-oac", self.config.bucket);
        let cdn = self.providers.cdn.as_ref();

        if let Some(id) = cdn.find_origin_access_control(&name).await? {
            info!("Reusing origin access control {name} ({id})");
            state.cloudfront_oac_id = Some(id.clone());
            return Ok(format!("reused {id}"));
        }

        let id = cdn.create_origin_access_control(&name).await?;
        state.cloudfront_oac_id = Some(id.clone());
        state.track(ResourceKind::CloudFrontOac);
        Ok(format!("created {id}"))
    }

    async fn ensure_certificate(&self, state: &mut DeploymentState) -> Result<String> {
        let domain = self.domain()?;
        let certificates = self.providers.certificates.as_ref();

        if let Some(arn) = certificates.find_certificate(domain).await? {
            info!("Reusing certificate for {domain}");
            state.acm_certificate_arn = Some(arn.clone());
            return Ok(format!("reused {arn}"));
        }

        let arn = certificates.request_certificate(domain).await?;
        info!("Requested certificate for {domain}");
        state.acm_certificate_arn = Some(arn.clone());
        state.track(ResourceKind::AcmCertificate);
        Ok(format!("requested {arn}"))
    }

    async fn publish_validation_record(&self, state: &mut DeploymentState) -> Result<String> {
        let domain = self.domain()?;
        let arn = required(state.acm_certificate_arn.as_ref(), "certificate ARN")?;

        let zone = HostedZoneResolver::new(self.providers.dns.as_ref())
            .resolve(domain)
            .await?;
        state.route53_zone_id = Some(zone.id.clone());

        let certificates: &dyn CertificateAuthority = self.providers.certificates.as_ref();
        let arn_ref = arn.as_str();
        let details = wait_until(
            "certificate validation record",
            &self.config.polling.certificate,
            move || async move {
                let details = certificates.describe_certificate(arn_ref).await?;
                if details.validation_record.is_some()
                    || details.status == CertificateStatus::Issued
                {
                    Ok(Readiness::Ready(details))
                } else {
                    Ok(Readiness::Pending(details.status.to_string()))
                }
            },
        )
        .await?;

        // A reused certificate that is already issued needs no record from us.
        if details.status == CertificateStatus::Issued
            && !state.tracks(ResourceKind::AcmCertificate)
        {
            info!("Certificate for {domain} is already issued");
            return Ok(String::from("certificate already issued"));
        }
        let Some(record) = details.validation_record else {
            return Err(ProviderError::invalid_response(
                "acm",
                format!("certificate {arn} has no DNS validation record"),
            )
            .into());
        };

        debug!("Publishing {} {} in zone {}", record.record_type, record.name, zone.id);
        self.providers
            .dns
            .upsert_record_set(&zone.id, &RecordSet::Simple(record.clone()))
            .await?;

        let detail = format!("{} in {}", record.name, zone.name);
        state.acm_validation_record = Some(record);
        state.track(ResourceKind::Route53ValidationRecord);
        Ok(detail)
    }

    async fn wait_for_issuance(&self, state: &DeploymentState) -> Result<String> {
        let arn = required(state.acm_certificate_arn.as_ref(), "certificate ARN")?;
        let certificates: &dyn CertificateAuthority = self.providers.certificates.as_ref();
        let arn_ref = arn.as_str();

        info!("Waiting for certificate to be issued (DNS validation can take a few minutes)");
        wait_until(
            "certificate issuance",
            &self.config.polling.certificate,
            move || async move {
                let details = certificates.describe_certificate(arn_ref).await?;
                if details.status == CertificateStatus::Issued {
                    return Ok(Readiness::Ready(()));
                }
                if details.status.is_terminal_failure() {
                    return Err(ProviderError::CertificateFailed {
                        arn: details.arn,
                        status: details.status.to_string(),
                        reason: details
                            .failure_reason
                            .unwrap_or_else(|| String::from("no reason given")),
                    }
                    .into());
                }
                Ok(Readiness::Pending(details.status.to_string()))
            },
        )
        .await?;

        Ok(String::from("issued"))
    }

    async fn ensure_distribution(&self, state: &mut DeploymentState) -> Result<String> {
        let bucket = &self.config.bucket;
        let region = &self.config.region;
        let cdn = self.providers.cdn.as_ref();
        let origin = bucket_rest_endpoint(bucket, region);

        let (info, detail) = if let Some(existing) = cdn.find_distribution(&origin).await? {
            info!("Reusing distribution {} for {origin}", existing.id);
            let detail = format!("reused {}", existing.id);
            (existing, detail)
        } else {
            let oac_id = required(state.cloudfront_oac_id.as_ref(), "origin access control")?;
            let mut spec = DistributionSpec::for_spa(bucket, region, &oac_id);
            if let Some(domain) = self.config.mode.domain() {
                let arn = required(state.acm_certificate_arn.as_ref(), "certificate ARN")?;
                spec = spec.with_custom_domain(domain, &arn);
            }

            let created = cdn.create_distribution(&spec).await?;
            info!("Created distribution {} ({})", created.id, created.domain_name);
            state.cloudfront_certificate_arn.clone_from(&spec.certificate_arn);
            state.track(ResourceKind::CloudFrontDistribution);
            let detail = format!("created {}", created.id);
            (created, detail)
        };

        state.cloudfront_distribution_id = Some(info.id);
        state.cloudfront_domain = Some(info.domain_name);
        state.cloudfront_arn = Some(info.arn);
        Ok(detail)
    }

    async fn restrict_to_distribution(&self, state: &mut DeploymentState) -> Result<String> {
        let bucket = &self.config.bucket;
        let distribution_arn = required(state.cloudfront_arn.as_ref(), "distribution ARN")?;
        let storage = self.providers.storage.as_ref();

        storage.disable_website(bucket).await?;
        storage
            .put_bucket_policy(bucket, &policy::distribution_only(bucket, &distribution_arn))
            .await?;
        storage.set_public_access(bucket, PublicAccess::CdnOnly).await?;

        state.s3_website_url = None;
        Ok(String::from("bucket readable by the distribution only"))
    }

    async fn attach_certificate(&self, state: &mut DeploymentState) -> Result<String> {
        let domain = self.domain()?;
        let id = required(state.cloudfront_distribution_id.as_ref(), "distribution ID")?;
        let arn = required(state.acm_certificate_arn.as_ref(), "certificate ARN")?;

        info!("Serving {domain} from distribution {id}");
        self.providers
            .cdn
            .attach_certificate(&id, domain, &arn)
            .await?;

        state.cloudfront_certificate_arn = Some(arn);
        Ok(format!("{domain} on {id}"))
    }

    async fn upload(&self, run: &mut RunContext) -> Result<String> {
        let objects = collect_uploads(&run.output_dir).await?;
        let uploaded = upload_all(
            self.providers.storage.as_ref(),
            &self.config.bucket,
            &objects,
            self.config.upload_concurrency,
        )
        .await?;

        run.uploaded_files = uploaded;
        Ok(format!("{uploaded} files"))
    }

    async fn publish_alias(&self, state: &mut DeploymentState) -> Result<String> {
        let domain = self.domain()?;
        let zone_id = required(state.route53_zone_id.as_ref(), "hosted zone ID")?;
        let target = required(state.cloudfront_domain.as_ref(), "distribution domain")?;

        self.providers
            .dns
            .upsert_record_set(&zone_id, &RecordSet::distribution_alias(domain, &target))
            .await?;

        state.domain = Some(domain.to_string());
        state.track(ResourceKind::Route53AliasRecord);
        Ok(format!("{domain} -> {target}"))
    }

    async fn invalidate(&self, state: &DeploymentState, run: &mut RunContext) -> Result<String> {
        let id = required(state.cloudfront_distribution_id.as_ref(), "distribution ID")?;
        let invalidation = self
            .providers
            .cdn
            .create_invalidation(&id, &[String::from("/*")])
            .await?;

        info!("Invalidation {invalidation} created for {id}");
        run.invalidation_id = Some(invalidation.clone());
        Ok(invalidation)
    }
}
