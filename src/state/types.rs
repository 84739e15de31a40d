//! State types for tracking provisioned resources.
//!
//! The deployment record is the only durable knowledge the tool has about what
//! it created. Teardown deletes exactly the kinds listed in `created_resources`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current version of the state format.
pub const STATE_VERSION: u32 = 1;

const fn default_version() -> u32 {
    STATE_VERSION
}

/// The persisted deployment record for one project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    /// State format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Name of the origin bucket.
    pub bucket_name: String,
    /// Region of the origin bucket.
    pub region: String,
    /// Public website endpoint, only in S3 website mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_website_url: Option<String>,
    /// CloudFront distribution ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudfront_distribution_id: Option<String>,
    /// CloudFront default domain name (`dxxxx.cloudfront.net`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudfront_domain: Option<String>,
    /// CloudFront distribution ARN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudfront_arn: Option<String>,
    /// Origin access control ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudfront_oac_id: Option<String>,
    /// Certificate currently attached to the distribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudfront_certificate_arn: Option<String>,
    /// Custom domain served by the distribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// ACM certificate ARN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acm_certificate_arn: Option<String>,
    /// DNS record published to validate the certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acm_validation_record: Option<ValidationRecord>,
    /// Hosted zone owning the custom domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route53_zone_id: Option<String>,
    /// Resource kinds this tool created, in creation order.
    #[serde(default)]
    pub created_resources: Vec<ResourceKind>,
    /// When the record was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// A DNS record the certificate authority asked us to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Record name.
    pub name: String,
    /// Record type, normally `CNAME`.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record value.
    pub value: String,
}

/// Kinds of resources the tool can create and later delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// The origin bucket.
    S3Bucket,
    /// The origin access control restricting bucket reads to the distribution.
    #[serde(rename = "cloudfront_oac")]
    CloudFrontOac,
    /// The CDN distribution.
    #[serde(rename = "cloudfront_distribution")]
    CloudFrontDistribution,
    /// The TLS certificate.
    AcmCertificate,
    /// The DNS record proving domain ownership to the certificate authority.
    #[serde(rename = "route53_validation_record")]
    Route53ValidationRecord,
    /// The DNS alias pointing the domain at the distribution.
    #[serde(rename = "route53_alias_record")]
    Route53AliasRecord,
}

impl DeploymentState {
    /// Creates an empty record for a bucket.
    #[must_use]
    pub fn new(bucket_name: &str, region: &str) -> Self {
        Self {
            version: STATE_VERSION,
            bucket_name: bucket_name.to_string(),
            region: region.to_string(),
            s3_website_url: None,
            cloudfront_distribution_id: None,
            cloudfront_domain: None,
            cloudfront_arn: None,
            cloudfront_oac_id: None,
            cloudfront_certificate_arn: None,
            domain: None,
            acm_certificate_arn: None,
            acm_validation_record: None,
            route53_zone_id: None,
            created_resources: Vec::new(),
            last_updated: None,
        }
    }

    /// Returns true if this tool created the given kind.
    #[must_use]
    pub fn tracks(&self, kind: ResourceKind) -> bool {
        self.created_resources.contains(&kind)
    }

    /// Records that this tool created a resource. Repeated calls are no-ops.
    pub fn track(&mut self, kind: ResourceKind) {
        if !self.tracks(kind) {
            self.created_resources.push(kind);
        }
    }

    /// Removes a kind after its resource has been deleted.
    pub fn untrack(&mut self, kind: ResourceKind) {
        self.created_resources.retain(|k| *k != kind);
    }

    /// Marks the record as modified now.
    pub fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }

    /// Returns true if nothing is left for teardown.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.created_resources.is_empty()
    }

    /// Returns the URL the site is served from, preferring the custom domain.
    #[must_use]
    pub fn site_url(&self) -> Option<String> {
        self.domain
            .as_ref()
            .map(|d| format!("https://{d}"))
            .or_else(|| self.cloudfront_domain.as_ref().map(|d| format!("https://{d}")))
            .or_else(|| self.s3_website_url.clone())
    }
}

impl ResourceKind {
    /// Human-readable description used in prompts and reports.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::S3Bucket => "S3 bucket",
            Self::CloudFrontOac => "CloudFront origin access control",
            Self::CloudFrontDistribution => "CloudFront distribution",
            Self::AcmCertificate => "ACM certificate",
            Self::Route53ValidationRecord => "Route53 certificate validation record",
            Self::Route53AliasRecord => "Route53 alias record",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::S3Bucket => "s3_bucket",
            Self::CloudFrontOac => "cloudfront_oac",
            Self::CloudFrontDistribution => "cloudfront_distribution",
            Self::AcmCertificate => "acm_certificate",
            Self::Route53ValidationRecord => "route53_validation_record",
            Self::Route53AliasRecord => "route53_alias_record",
        };
        write!(f, "{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_state() -> DeploymentState {
        let mut state = DeploymentState::new("my-app", "eu-west-1");
        state.cloudfront_distribution_id = Some(String::from("E123"));
        state.cloudfront_domain = Some(String::from("d111.cloudfront.net"));
        state.cloudfront_arn = Some(String::from("arn:aws:cloudfront::1:distribution/E123"));
        state.cloudfront_oac_id = Some(String::from("OAC1"));
        state.cloudfront_certificate_arn = Some(String::from("arn:aws:acm:us-east-1:1:certificate/c"));
        state.s3_website_url = Some(String::from("http://my-app.s3-website-eu-west-1.amazonaws.com"));
        state.domain = Some(String::from("app.example.com"));
        state.acm_certificate_arn = Some(String::from("arn:aws:acm:us-east-1:1:certificate/c"));
        state.acm_validation_record = Some(ValidationRecord {
            name: String::from("_x.app.example.com."),
            record_type: String::from("CNAME"),
            value: String::from("_y.acm-validations.aws."),
        });
        state.route53_zone_id = Some(String::from("Z1"));
        state.track(ResourceKind::S3Bucket);
        state.track(ResourceKind::CloudFrontOac);
        state.track(ResourceKind::AcmCertificate);
        state.touch();
        state
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let state = full_state();
        let json = serde_json::to_string_pretty(&state).expect("serialize");
        let loaded: DeploymentState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_missing_domain_fields_load_as_absent() {
        let json = r#"{
            "bucket_name": "my-app",
            "region": "us-east-1",
            "cloudfront_distribution_id": "E123",
            "cloudfront_domain": "d111.cloudfront.net",
            "created_resources": ["s3_bucket", "cloudfront_distribution"]
        }"#;
        let state: DeploymentState = serde_json::from_str(json).expect("deserialize");

        assert_eq!(state.version, STATE_VERSION);
        assert!(state.domain.is_none());
        assert!(state.acm_certificate_arn.is_none());
        assert!(state.route53_zone_id.is_none());
        assert_eq!(
            state.created_resources,
            vec![ResourceKind::S3Bucket, ResourceKind::CloudFrontDistribution]
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"bucket_name": "b", "region": "us-east-1", "added_later": 42}"#;
        let state: DeploymentState = serde_json::from_str(json).expect("deserialize");
        assert_eq!(state.bucket_name, "b");
        assert!(state.created_resources.is_empty());
    }

    #[test]
    fn test_unknown_resource_kind_is_rejected() {
        let json = r#"{"bucket_name": "b", "region": "us-east-1", "created_resources": ["lambda"]}"#;
        assert!(serde_json::from_str::<DeploymentState>(json).is_err());
    }

    #[test]
    fn test_track_is_an_ordered_set() {
        let mut state = DeploymentState::new("b", "us-east-1");
        state.track(ResourceKind::S3Bucket);
        state.track(ResourceKind::AcmCertificate);
        state.track(ResourceKind::S3Bucket);
        assert_eq!(
            state.created_resources,
            vec![ResourceKind::S3Bucket, ResourceKind::AcmCertificate]
        );

        state.untrack(ResourceKind::S3Bucket);
        assert_eq!(state.created_resources, vec![ResourceKind::AcmCertificate]);
        assert!(!state.is_drained());
    }

    #[test]
    fn test_resource_kind_tags_match_display() {
        for kind in [
            ResourceKind::S3Bucket,
            ResourceKind::CloudFrontOac,
            ResourceKind::CloudFrontDistribution,
            ResourceKind::AcmCertificate,
            ResourceKind::Route53ValidationRecord,
            ResourceKind::Route53AliasRecord,
        ] {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_site_url_prefers_custom_domain() {
        let mut state = full_state();
        assert_eq!(state.site_url().as_deref(), Some("https://app.example.com"));

        state.domain = None;
        assert_eq!(state.site_url().as_deref(), Some("https://d111.cloudfront.net"));

        state.cloudfront_domain = None;
        assert_eq!(
            state.site_url().as_deref(),
            Some("http://my-app.s3-website-eu-west-1.amazonaws.com")
        );
    }
}
