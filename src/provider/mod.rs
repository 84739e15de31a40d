//! Cloud provider boundary.
//!
//! The orchestrator talks to the cloud only through four small capability
//! traits, one per service. The AWS implementations live in [`aws`]; tests use
//! in-memory fakes implementing the same traits.

pub mod aws;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use traits::{Cdn, CertificateAuthority, Dns, ObjectStorage, Providers};
pub use types::{
    AliasTarget, CACHING_OPTIMIZED_POLICY_ID, CLOUDFRONT_HOSTED_ZONE_ID, CertificateDetails,
    CertificateStatus, DISTRIBUTION_DEPLOYED, DistributionInfo, DistributionSpec, ErrorResponse,
    HostedZone, ObjectUpload, PublicAccess, RecordSet, bucket_rest_endpoint,
};
