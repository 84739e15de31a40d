//! CloudFront distributions, origin access controls and invalidations.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::types::{
    Aliases, AllowedMethods, CustomErrorResponse, CustomErrorResponses, DefaultCacheBehavior,
    Distribution, DistributionConfig, InvalidationBatch, Method, MinimumProtocolVersion, Origin,
    OriginAccessControlConfig, OriginAccessControlOriginTypes, OriginAccessControlSigningBehaviors,
    OriginAccessControlSigningProtocols, Origins, Paths, S3OriginConfig, SslSupportMethod,
    ViewerCertificate, ViewerProtocolPolicy,
};
use tracing::debug;

use crate::error::{ProviderError, Result, SpaDeployError};
use crate::provider::traits::Cdn;
use crate::provider::types::{DistributionInfo, DistributionSpec};

use super::{build_error, request_error, resource_error};

const SERVICE: &str = "cloudfront";

/// CloudFront-backed [`Cdn`].
#[derive(Debug, Clone)]
pub struct CloudFrontCdn {
    client: Client,
}

impl CloudFrontCdn {
    /// Creates the CloudFront client.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Fetches the current config and its `ETag` for an update.
    async fn current_config(&self, id: &str) -> Result<(DistributionConfig, Option<String>)> {
        let output = self
            .client
            .get_distribution_config()
            .id(id)
            .send()
            .await
            .map_err(|e| {
                resource_error(
                    SERVICE,
                    "GetDistributionConfig",
                    "CloudFront distribution",
                    id,
                    &["NoSuchDistribution"],
                    e,
                )
            })?;

        let config = output.distribution_config().cloned().ok_or_else(|| {
            ProviderError::invalid_response(SERVICE, format!("no config returned for {id}"))
        })?;
        Ok((config, output.e_tag().map(str::to_string)))
    }

    async fn update_config(
        &self,
        id: &str,
        config: DistributionConfig,
        etag: Option<String>,
    ) -> Result<()> {
        self.client
            .update_distribution()
            .id(id)
            .set_if_match(etag)
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "UpdateDistribution", e))?;
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> SpaDeployError {
    ProviderError::invalid_response(SERVICE, message).into()
}

fn quantity(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|e| build_error(SERVICE, e))
}

fn distribution_info(distribution: &Distribution) -> DistributionInfo {
    DistributionInfo {
        id: distribution.id().to_string(),
        arn: distribution.arn().to_string(),
        domain_name: distribution.domain_name().to_string(),
        status: distribution.status().to_string(),
        enabled: distribution
            .distribution_config()
            .is_some_and(DistributionConfig::enabled),
    }
}

fn aliases(names: &[String]) -> Result<Aliases> {
    Aliases::builder()
        .quantity(quantity(names.len())?)
        .set_items(Some(names.to_vec()))
        .build()
        .map_err(|e| build_error(SERVICE, e))
}

fn viewer_certificate(certificate_arn: Option<&str>) -> ViewerCertificate {
    match certificate_arn {
        Some(arn) => ViewerCertificate::builder()
            .acm_certificate_arn(arn)
            .ssl_support_method(SslSupportMethod::from("sni-only"))
            .minimum_protocol_version(MinimumProtocolVersion::from("TLSv1.2_2021"))
            .build(),
        None => ViewerCertificate::builder()
            .cloud_front_default_certificate(true)
            .build(),
    }
}

fn distribution_config(spec: &DistributionSpec) -> Result<DistributionConfig> {
    let origin = Origin::builder()
        .id(&spec.origin_id)
        .domain_name(&spec.origin_domain)
        .origin_access_control_id(&spec.oac_id)
        .s3_origin_config(
            S3OriginConfig::builder()
                .origin_access_identity("")
                .build(),
        )
        .build()
        .map_err(|e| build_error(SERVICE, e))?;

    let origins = Origins::builder()
        .quantity(1)
        .items(origin)
        .build()
        .map_err(|e| build_error(SERVICE, e))?;

    let allowed_methods = AllowedMethods::builder()
        .quantity(2)
        .items(Method::from("GET"))
        .items(Method::from("HEAD"))
        .build()
        .map_err(|e| build_error(SERVICE, e))?;

    let viewer_policy = if spec.redirect_to_https {
        ViewerProtocolPolicy::from("redirect-to-https")
    } else {
        ViewerProtocolPolicy::from("allow-all")
    };

    let behavior = DefaultCacheBehavior::builder()
        .target_origin_id(&spec.origin_id)
        .viewer_protocol_policy(viewer_policy)
        .allowed_methods(allowed_methods)
        .cache_policy_id(&spec.cache_policy_id)
        .compress(spec.compress)
        .build()
        .map_err(|e| build_error(SERVICE, e))?;

    let mut error_responses =
        CustomErrorResponses::builder().quantity(quantity(spec.error_responses.len())?);
    for response in &spec.error_responses {
        error_responses = error_responses.items(
            CustomErrorResponse::builder()
                .error_code(response.error_code)
                .response_page_path(&response.response_page_path)
                .response_code(&response.response_code)
                .error_caching_min_ttl(response.error_caching_min_ttl)
                .build()
                .map_err(|e| build_error(SERVICE, e))?,
        );
    }

    let mut config = DistributionConfig::builder()
        .caller_reference(&spec.caller_reference)
        .comment(&spec.comment)
        .enabled(true)
        .default_root_object(&spec.default_root_object)
        .origins(origins)
        .default_cache_behavior(behavior)
        .custom_error_responses(
            error_responses
                .build()
                .map_err(|e| build_error(SERVICE, e))?,
        )
        .viewer_certificate(viewer_certificate(spec.certificate_arn.as_deref()));

    if !spec.aliases.is_empty() {
        config = config.aliases(aliases(&spec.aliases)?);
    }

    config.build().map_err(|e| build_error(SERVICE, e))
}

#[async_trait]
impl Cdn for CloudFrontCdn {
    async fn find_origin_access_control(&self, name: &str) -> Result<Option<String>> {
        let mut marker: Option<String> = None;
        loop {
            let output = self
                .client
                .list_origin_access_controls()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| request_error(SERVICE, "ListOriginAccessControls", e))?;

            let Some(list) = output.origin_access_control_list() else {
                return Ok(None);
            };
            if let Some(found) = list.items().iter().find(|oac| oac.name() == name) {
                return Ok(Some(found.id().to_string()));
            }
            match list.next_marker() {
                Some(next) if list.is_truncated() => marker = Some(next.to_string()),
                _ => return Ok(None),
            }
        }
    }

    async fn create_origin_access_control(&self, name: &str) -> Result<String> {
        let config = OriginAccessControlConfig::builder()
            .name(name)
            .description(format!("Origin access for {name}"))
            .origin_access_control_origin_type(OriginAccessControlOriginTypes::from("s3"))
            .signing_behavior(OriginAccessControlSigningBehaviors::from("always"))
            .signing_protocol(OriginAccessControlSigningProtocols::from("sigv4"))
            .build()
            .map_err(|e| build_error(SERVICE, e))?;

        let output = self
            .client
            .create_origin_access_control()
            .origin_access_control_config(config)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "CreateOriginAccessControl", e))?;

        let id = output
            .origin_access_control()
            .map(|oac| oac.id().to_string())
            .ok_or_else(|| invalid("CreateOriginAccessControl returned no origin access control"))?;

        debug!("Created origin access control {id} ({name})");
        Ok(id)
    }

    async fn delete_origin_access_control(&self, id: &str) -> Result<()> {
        let missing = &["NoSuchOriginAccessControl"];
        let current = self
            .client
            .get_origin_access_control()
            .id(id)
            .send()
            .await
            .map_err(|e| {
                resource_error(
                    SERVICE,
                    "GetOriginAccessControl",
                    "CloudFront origin access control",
                    id,
                    missing,
                    e,
                )
            })?;

        self.client
            .delete_origin_access_control()
            .id(id)
            .set_if_match(current.e_tag().map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                resource_error(
                    SERVICE,
                    "DeleteOriginAccessControl",
                    "CloudFront origin access control",
                    id,
                    missing,
                    e,
                )
            })?;
        Ok(())
    }

    async fn find_distribution(&self, origin_domain: &str) -> Result<Option<DistributionInfo>> {
        let mut marker: Option<String> = None;
        loop {
            let output = self
                .client
                .list_distributions()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| request_error(SERVICE, "ListDistributions", e))?;

            let Some(list) = output.distribution_list() else {
                return Ok(None);
            };

            let found = list.items().iter().find(|summary| {
                summary.origins().is_some_and(|origins| {
                    origins
                        .items()
                        .iter()
                        .any(|origin| origin.domain_name() == origin_domain)
                })
            });
            if let Some(summary) = found {
                return Ok(Some(DistributionInfo {
                    id: summary.id().to_string(),
                    arn: summary.arn().to_string(),
                    domain_name: summary.domain_name().to_string(),
                    status: summary.status().to_string(),
                    enabled: summary.enabled(),
                }));
            }

            match list.next_marker() {
                Some(next) if list.is_truncated() => marker = Some(next.to_string()),
                _ => return Ok(None),
            }
        }
    }

    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<DistributionInfo> {
        let output = self
            .client
            .create_distribution()
            .distribution_config(distribution_config(spec)?)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "CreateDistribution", e))?;

        output
            .distribution()
            .map(distribution_info)
            .ok_or_else(|| invalid("CreateDistribution returned no distribution"))
    }

    async fn get_distribution(&self, id: &str) -> Result<DistributionInfo> {
        let output = self
            .client
            .get_distribution()
            .id(id)
            .send()
            .await
            .map_err(|e| {
                resource_error(
                    SERVICE,
                    "GetDistribution",
                    "CloudFront distribution",
                    id,
                    &["NoSuchDistribution"],
                    e,
                )
            })?;

        output
            .distribution()
            .map(distribution_info)
            .ok_or_else(|| invalid(format!("GetDistribution returned nothing for {id}")))
    }

    async fn attach_certificate(
        &self,
        id: &str,
        domain: &str,
        certificate_arn: &str,
    ) -> Result<()> {
        let (mut config, etag) = self.current_config(id).await?;
        config.aliases = Some(aliases(&[domain.to_string()])?);
        config.viewer_certificate = Some(viewer_certificate(Some(certificate_arn)));
        self.update_config(id, config, etag).await?;

        debug!("Attached {certificate_arn} to distribution {id} for {domain}");
        Ok(())
    }

    async fn disable_distribution(&self, id: &str) -> Result<()> {
        let (mut config, etag) = self.current_config(id).await?;
        if !config.enabled() {
            debug!("Distribution {id} already disabled");
            return Ok(());
        }
        config.enabled = false;
        self.update_config(id, config, etag).await
    }

    async fn delete_distribution(&self, id: &str) -> Result<()> {
        let missing = &["NoSuchDistribution"];
        let current = self
            .client
            .get_distribution()
            .id(id)
            .send()
            .await
            .map_err(|e| {
                resource_error(
                    SERVICE,
                    "GetDistribution",
                    "CloudFront distribution",
                    id,
                    missing,
                    e,
                )
            })?;

        self.client
            .delete_distribution()
            .id(id)
            .set_if_match(current.e_tag().map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                resource_error(
                    SERVICE,
                    "DeleteDistribution",
                    "CloudFront distribution",
                    id,
                    missing,
                    e,
                )
            })?;
        Ok(())
    }

    async fn create_invalidation(&self, id: &str, paths: &[String]) -> Result<String> {
        let paths = Paths::builder()
            .quantity(quantity(paths.len())?)
            .set_items(Some(paths.to_vec()))
            .build()
            .map_err(|e| build_error(SERVICE, e))?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(uuid::Uuid::new_v4().to_string())
            .build()
            .map_err(|e| build_error(SERVICE, e))?;

        let output = self
            .client
            .create_invalidation()
            .distribution_id(id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "CreateInvalidation", e))?;

        output
            .invalidation()
            .map(|invalidation| invalidation.id().to_string())
            .ok_or_else(|| invalid("CreateInvalidation returned no invalidation"))
    }
}
