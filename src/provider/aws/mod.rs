//! AWS implementations of the provider capability traits.
//!
//! Each service gets its own client built from one shared SDK configuration.
//! ACM is pinned to `us-east-1` because CloudFront only accepts certificates
//! from that region.

mod acm;
mod cloudfront;
mod route53;
mod s3;

use std::sync::Arc;

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use tracing::debug;

use crate::error::{ProviderError, SpaDeployError};

use super::traits::Providers;

pub use acm::AcmCertificateAuthority;
pub use cloudfront::CloudFrontCdn;
pub use route53::Route53Dns;
pub use s3::S3Storage;

/// Region CloudFront requires certificates to live in.
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// Loads AWS credentials from the environment and builds all four providers.
pub async fn load_providers(region: &str) -> Providers {
    let config = aws_config::from_env()
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await;

    debug!("Loaded AWS configuration for region {region}");

    Providers {
        storage: Arc::new(S3Storage::new(&config)),
        cdn: Arc::new(CloudFrontCdn::new(&config)),
        certificates: Arc::new(AcmCertificateAuthority::new(&config)),
        dns: Arc::new(Route53Dns::new(&config)),
    }
}

/// Converts an SDK error into a provider error with the full error chain.
fn request_error<E: std::error::Error>(
    service: &'static str,
    operation: &'static str,
    err: E,
) -> SpaDeployError {
    ProviderError::request(service, operation, DisplayErrorContext(err)).into()
}

/// Like [`request_error`], but maps "does not exist" codes to `NotFound`.
fn resource_error<E>(
    service: &'static str,
    operation: &'static str,
    resource: &str,
    id: &str,
    missing_codes: &[&str],
    err: E,
) -> SpaDeployError
where
    E: std::error::Error + ProvideErrorMetadata,
{
    if err.code().is_some_and(|code| missing_codes.contains(&code)) {
        return ProviderError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
        .into();
    }
    request_error(service, operation, err)
}

/// Converts a request builder error.
fn build_error(service: &'static str, err: impl std::fmt::Display) -> SpaDeployError {
    ProviderError::request(service, "build request", err).into()
}
