//! ACM certificates, always in `us-east-1`.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_acm::Client;
use aws_sdk_acm::config::Region;
use aws_sdk_acm::types::{CertificateDetail, CertificateStatus as AcmStatus, ValidationMethod};
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::provider::traits::CertificateAuthority;
use crate::provider::types::{CertificateDetails, CertificateStatus};
use crate::state::ValidationRecord;

use super::{CERTIFICATE_REGION, request_error, resource_error};

const SERVICE: &str = "acm";

const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";

/// ACM-backed [`CertificateAuthority`].
#[derive(Debug, Clone)]
pub struct AcmCertificateAuthority {
    client: Client,
}

impl AcmCertificateAuthority {
    /// Creates an ACM client pinned to the CloudFront certificate region,
    /// whatever region the shared configuration uses.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        let acm_config = aws_sdk_acm::config::Builder::from(config)
            .region(Region::new(CERTIFICATE_REGION))
            .build();
        Self {
            client: Client::from_conf(acm_config),
        }
    }
}

fn details(arn: &str, detail: &CertificateDetail) -> CertificateDetails {
    let status = detail.status().map_or_else(
        || CertificateStatus::Other(String::from("UNKNOWN")),
        |s| CertificateStatus::parse(s.as_str()),
    );

    let validation_record = detail
        .domain_validation_options()
        .first()
        .and_then(|option| option.resource_record())
        .map(|record| ValidationRecord {
            name: record.name().to_string(),
            record_type: record.r#type().as_str().to_string(),
            value: record.value().to_string(),
        });

    CertificateDetails {
        arn: arn.to_string(),
        status,
        validation_record,
        failure_reason: detail.failure_reason().map(|r| r.as_str().to_string()),
    }
}

#[async_trait]
impl CertificateAuthority for AcmCertificateAuthority {
    async fn find_certificate(&self, domain: &str) -> Result<Option<String>> {
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .list_certificates()
                .certificate_statuses(AcmStatus::from("ISSUED"))
                .certificate_statuses(AcmStatus::from("PENDING_VALIDATION"))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| request_error(SERVICE, "ListCertificates", e))?;

            let found = output
                .certificate_summary_list()
                .iter()
                .filter(|summary| summary.domain_name() == Some(domain))
                .find_map(|summary| summary.certificate_arn());
            if let Some(arn) = found {
                return Ok(Some(arn.to_string()));
            }

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => return Ok(None),
            }
        }
    }

    async fn request_certificate(&self, domain: &str) -> Result<String> {
        let output = self
            .client
            .request_certificate()
            .domain_name(domain)
            .validation_method(ValidationMethod::from("DNS"))
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "RequestCertificate", e))?;

        let arn = output.certificate_arn().map(str::to_string).ok_or_else(|| {
            ProviderError::invalid_response(SERVICE, "RequestCertificate returned no ARN")
        })?;

        debug!("Requested certificate {arn} for {domain}");
        Ok(arn)
    }

    async fn describe_certificate(&self, arn: &str) -> Result<CertificateDetails> {
        let output = self
            .client
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| {
                resource_error(
                    SERVICE,
                    "DescribeCertificate",
                    "ACM certificate",
                    arn,
                    &[RESOURCE_NOT_FOUND],
                    e,
                )
            })?;

        let detail = output.certificate().ok_or_else(|| {
            ProviderError::invalid_response(SERVICE, format!("no certificate detail for {arn}"))
        })?;
        Ok(details(arn, detail))
    }

    async fn delete_certificate(&self, arn: &str) -> Result<()> {
        self.client
            .delete_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| {
                resource_error(
                    SERVICE,
                    "DeleteCertificate",
                    "ACM certificate",
                    arn,
                    &[RESOURCE_NOT_FOUND],
                    e,
                )
            })?;
        Ok(())
    }
}
