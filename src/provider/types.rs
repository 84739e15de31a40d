//! Value types exchanged across the provider boundary.

use std::path::PathBuf;

use crate::state::ValidationRecord;

/// Managed "CachingOptimized" cache policy.
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

/// Fixed hosted zone that all CloudFront alias targets live in.
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Status CloudFront reports once a configuration change has propagated.
pub const DISTRIBUTION_DEPLOYED: &str = "Deployed";

/// Origin ID used inside the distribution config.
const ORIGIN_ID: &str = "s3origin";

/// A DNS hosted zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    /// Zone ID without the `/hostedzone/` prefix.
    pub id: String,
    /// Zone name without the trailing dot.
    pub name: String,
}

/// Public access posture of the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicAccess {
    /// Everything readable by anyone; used for S3 website hosting.
    PublicWebsite,
    /// All public access blocked; reads go through the distribution only.
    CdnOnly,
}

impl PublicAccess {
    /// Returns whether the public-access block flags should be set.
    #[must_use]
    pub const fn blocked(self) -> bool {
        matches!(self, Self::CdnOnly)
    }
}

/// A single file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUpload {
    /// Object key, always `/`-separated.
    pub key: String,
    /// Local file path.
    pub path: PathBuf,
    /// MIME type.
    pub content_type: String,
    /// Explicit `Cache-Control` header, if any.
    pub cache_control: Option<String>,
}

/// A custom error response mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// HTTP status returned by the origin.
    pub error_code: i32,
    /// Page served instead.
    pub response_page_path: String,
    /// Status returned to the viewer.
    pub response_code: String,
    /// How long CloudFront caches the error response.
    pub error_caching_min_ttl: i64,
}

/// Everything needed to create a distribution for a single-page app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSpec {
    /// Idempotency token for the create call.
    pub caller_reference: String,
    /// Distribution comment.
    pub comment: String,
    /// Origin ID referenced by the default behavior.
    pub origin_id: String,
    /// Bucket REST endpoint.
    pub origin_domain: String,
    /// Origin access control signing requests to the bucket.
    pub oac_id: String,
    /// Object served for `/`.
    pub default_root_object: String,
    /// Redirect plain HTTP viewers to HTTPS.
    pub redirect_to_https: bool,
    /// Cache policy for the default behavior.
    pub cache_policy_id: String,
    /// Compress responses at the edge.
    pub compress: bool,
    /// Error responses rewritten for client-side routing.
    pub error_responses: Vec<ErrorResponse>,
    /// Alternate domain names.
    pub aliases: Vec<String>,
    /// Certificate for the aliases; `None` uses the default CloudFront certificate.
    pub certificate_arn: Option<String>,
}

impl DistributionSpec {
    /// Builds the distribution config fronting a bucket.
    ///
    /// A 403 from the private bucket (unknown path) is answered with
    /// `/index.html` and status 200 so the client-side router can handle it.
    #[must_use]
    pub fn for_spa(bucket: &str, region: &str, oac_id: &str) -> Self {
        Self {
            caller_reference: uuid::Uuid::new_v4().to_string(),
            comment: format!("SPA deploy: {bucket}"),
            origin_id: String::from(ORIGIN_ID),
            origin_domain: bucket_rest_endpoint(bucket, region),
            oac_id: oac_id.to_string(),
            default_root_object: String::from("index.html"),
            redirect_to_https: true,
            cache_policy_id: String::from(CACHING_OPTIMIZED_POLICY_ID),
            compress: true,
            error_responses: vec![ErrorResponse {
                error_code: 403,
                response_page_path: String::from("/index.html"),
                response_code: String::from("200"),
                error_caching_min_ttl: 10,
            }],
            aliases: Vec::new(),
            certificate_arn: None,
        }
    }

    /// Serves the distribution under a custom domain with the given certificate.
    #[must_use]
    pub fn with_custom_domain(mut self, domain: &str, certificate_arn: &str) -> Self {
        self.aliases = vec![domain.to_string()];
        self.certificate_arn = Some(certificate_arn.to_string());
        self
    }
}

/// Returns the regional REST endpoint of a bucket.
#[must_use]
pub fn bucket_rest_endpoint(bucket: &str, region: &str) -> String {
    format!("{bucket}.s3.{region}.amazonaws.com")
}

/// Observed state of a distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionInfo {
    /// Distribution ID.
    pub id: String,
    /// Distribution ARN.
    pub arn: String,
    /// Default domain name.
    pub domain_name: String,
    /// Deployment status (`InProgress` or `Deployed`).
    pub status: String,
    /// Whether the distribution serves traffic.
    pub enabled: bool,
}

impl DistributionInfo {
    /// Returns true once the last configuration change has propagated.
    #[must_use]
    pub fn is_deployed(&self) -> bool {
        self.status == DISTRIBUTION_DEPLOYED
    }
}

/// Certificate lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateStatus {
    /// Waiting for the validation record to be observed.
    PendingValidation,
    /// Issued and usable.
    Issued,
    /// Validation failed.
    Failed,
    /// Validation was not completed in time.
    ValidationTimedOut,
    /// Revoked by the authority.
    Revoked,
    /// Any other status.
    Other(String),
}

impl CertificateStatus {
    /// Parses the authority's status string.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "PENDING_VALIDATION" => Self::PendingValidation,
            "ISSUED" => Self::Issued,
            "FAILED" => Self::Failed,
            "VALIDATION_TIMED_OUT" => Self::ValidationTimedOut,
            "REVOKED" => Self::Revoked,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns true if the certificate can never become issued.
    #[must_use]
    pub const fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::ValidationTimedOut | Self::Revoked)
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::PendingValidation => "PENDING_VALIDATION",
            Self::Issued => "ISSUED",
            Self::Failed => "FAILED",
            Self::ValidationTimedOut => "VALIDATION_TIMED_OUT",
            Self::Revoked => "REVOKED",
            Self::Other(other) => other.as_str(),
        };
        write!(f, "{status}")
    }
}

/// Observed state of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    /// Certificate ARN.
    pub arn: String,
    /// Current status.
    pub status: CertificateStatus,
    /// Validation record, once the authority has generated it.
    pub validation_record: Option<ValidationRecord>,
    /// Failure reason for failed certificates.
    pub failure_reason: Option<String>,
}

/// Target of a DNS alias record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    /// Endpoint the alias resolves to.
    pub dns_name: String,
    /// Hosted zone of the endpoint.
    pub hosted_zone_id: String,
}

/// A record set the tool manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSet {
    /// A plain record with a TTL, used for certificate validation.
    Simple(ValidationRecord),
    /// An `A` alias record.
    Alias {
        /// Record name.
        name: String,
        /// Alias target.
        target: AliasTarget,
    },
}

impl RecordSet {
    /// Builds the alias pointing a domain at a distribution.
    #[must_use]
    pub fn distribution_alias(domain: &str, distribution_domain: &str) -> Self {
        Self::Alias {
            name: domain.to_string(),
            target: AliasTarget {
                dns_name: distribution_domain.to_string(),
                hosted_zone_id: String::from(CLOUDFRONT_HOSTED_ZONE_ID),
            },
        }
    }

    /// Returns the record name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(record) => &record.name,
            Self::Alias { name, .. } => name,
        }
    }
}
