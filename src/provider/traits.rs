//! Capability traits, one per cloud service.
//!
//! Every state-changing call returns once the provider has accepted the
//! request. None of them wait for asynchronous completion; callers poll.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

use super::types::{
    CertificateDetails, DistributionInfo, DistributionSpec, HostedZone, ObjectUpload,
    PublicAccess, RecordSet,
};

/// Object storage (S3).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Returns true if the bucket exists and is accessible.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Creates a bucket in a region.
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    /// Sets the public-access block flags.
    async fn set_public_access(&self, bucket: &str, access: PublicAccess) -> Result<()>;

    /// Replaces the bucket policy.
    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()>;

    /// Enables static website hosting.
    async fn enable_website(&self, bucket: &str, index_document: &str, error_document: &str)
        -> Result<()>;

    /// Disables static website hosting. Succeeds if it was not enabled.
    async fn disable_website(&self, bucket: &str) -> Result<()>;

    /// Uploads a single file, overwriting any existing object.
    async fn put_object(&self, bucket: &str, object: &ObjectUpload) -> Result<()>;

    /// Deletes every object version and delete marker. Returns how many were deleted.
    async fn delete_all_versions(&self, bucket: &str) -> Result<usize>;

    /// Deletes an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

/// Content delivery network (CloudFront).
#[async_trait]
pub trait Cdn: Send + Sync {
    /// Finds an origin access control by name.
    async fn find_origin_access_control(&self, name: &str) -> Result<Option<String>>;

    /// Creates an S3 origin access control and returns its ID.
    async fn create_origin_access_control(&self, name: &str) -> Result<String>;

    /// Deletes an origin access control.
    async fn delete_origin_access_control(&self, id: &str) -> Result<()>;

    /// Finds a distribution whose origin is the given domain.
    async fn find_distribution(&self, origin_domain: &str) -> Result<Option<DistributionInfo>>;

    /// Creates a distribution.
    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<DistributionInfo>;

    /// Reads the current state of a distribution.
    async fn get_distribution(&self, id: &str) -> Result<DistributionInfo>;

    /// Attaches a custom domain and its certificate to an existing distribution.
    async fn attach_certificate(&self, id: &str, domain: &str, certificate_arn: &str)
        -> Result<()>;

    /// Disables a distribution. The change propagates asynchronously.
    async fn disable_distribution(&self, id: &str) -> Result<()>;

    /// Deletes a disabled, deployed distribution.
    async fn delete_distribution(&self, id: &str) -> Result<()>;

    /// Invalidates cached paths and returns the invalidation ID.
    async fn create_invalidation(&self, id: &str, paths: &[String]) -> Result<String>;
}

/// Certificate authority (ACM).
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Finds an issued or pending certificate for exactly this domain.
    async fn find_certificate(&self, domain: &str) -> Result<Option<String>>;

    /// Requests a DNS-validated certificate and returns its ARN.
    async fn request_certificate(&self, domain: &str) -> Result<String>;

    /// Reads status and validation metadata.
    async fn describe_certificate(&self, arn: &str) -> Result<CertificateDetails>;

    /// Deletes a certificate.
    async fn delete_certificate(&self, arn: &str) -> Result<()>;
}

/// DNS (Route53).
#[async_trait]
pub trait Dns: Send + Sync {
    /// Finds a hosted zone whose name is exactly `name`.
    async fn find_zone(&self, name: &str) -> Result<Option<HostedZone>>;

    /// Creates or replaces a record set.
    async fn upsert_record_set(&self, zone_id: &str, record: &RecordSet) -> Result<()>;

    /// Deletes a record set.
    async fn delete_record_set(&self, zone_id: &str, record: &RecordSet) -> Result<()>;
}

/// The four capabilities the orchestrator needs.
#[derive(Clone)]
pub struct Providers {
    /// Object storage.
    pub storage: Arc<dyn ObjectStorage>,
    /// CDN.
    pub cdn: Arc<dyn Cdn>,
    /// Certificate authority.
    pub certificates: Arc<dyn CertificateAuthority>,
    /// DNS.
    pub dns: Arc<dyn Dns>,
}
