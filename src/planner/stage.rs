//! Pipeline stages and the decision whether each one runs.

use serde::Serialize;

use crate::config::DeployMode;
use crate::state::{DeploymentState, ResourceKind};

/// A step of the provisioning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Ensure the origin bucket exists.
    Bucket,
    /// Public website hosting on the bucket.
    WebsiteHosting,
    /// Origin access control for the distribution.
    OriginAccessControl,
    /// Request or reuse the certificate.
    Certificate,
    /// Publish the certificate's DNS validation record.
    ValidationRecord,
    /// Wait for the certificate to be issued.
    CertificateIssued,
    /// Create or reuse the distribution.
    Distribution,
    /// Lock the bucket down to the distribution.
    DistributionAccess,
    /// Attach the certificate to a distribution created without it.
    AttachCertificate,
    /// Upload the build output.
    Upload,
    /// Point the domain at the distribution.
    AliasRecord,
    /// Invalidate cached content after a redeploy.
    Invalidation,
}

impl Stage {
    /// Stable identifier used in logs and JSON output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::WebsiteHosting => "website_hosting",
            Self::OriginAccessControl => "origin_access_control",
            Self::Certificate => "certificate",
            Self::ValidationRecord => "validation_record",
            Self::CertificateIssued => "certificate_issued",
            Self::Distribution => "distribution",
            Self::DistributionAccess => "distribution_access",
            Self::AttachCertificate => "attach_certificate",
            Self::Upload => "upload",
            Self::AliasRecord => "alias_record",
            Self::Invalidation => "invalidation",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a stage will not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The stage does not apply to the serving mode.
    NotApplicable,
    /// The resource it creates is already tracked.
    AlreadyCreated(ResourceKind),
    /// The distribution already serves the current certificate.
    CertificateAttached,
    /// Nothing cached yet on a first deployment.
    FirstDeployment,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "not used in this mode"),
            Self::AlreadyCreated(kind) => write!(f, "{} already created", kind.description()),
            Self::CertificateAttached => write!(f, "certificate already attached"),
            Self::FirstDeployment => write!(f, "first deployment, nothing cached"),
        }
    }
}

/// Whether a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDecision {
    /// Execute the stage.
    Run,
    /// Skip it.
    Skip(SkipReason),
}

/// Static description of a stage.
#[derive(Debug, Clone, Copy)]
pub struct StageDescriptor {
    /// The stage.
    pub stage: Stage,
    /// What the stage does, for plans and logs.
    pub description: &'static str,
    /// Serving modes the stage applies to.
    pub applies: fn(&DeployMode) -> bool,
    /// Resource kind whose presence in the record means the stage is done.
    pub tracks: Option<ResourceKind>,
    /// Creating this resource needs the user's approval.
    pub requires_confirmation: bool,
}

const fn any_mode(_: &DeployMode) -> bool {
    true
}

const fn website_mode(mode: &DeployMode) -> bool {
    matches!(mode, DeployMode::S3Website)
}

const fn cdn_mode(mode: &DeployMode) -> bool {
    mode.uses_cdn()
}

const fn domain_mode(mode: &DeployMode) -> bool {
    matches!(mode, DeployMode::CustomDomain { .. })
}

/// Stages in execution order.
///
/// Mostly plain dependency order. The exception: the certificate stages run
/// before the distribution, because a distribution serving a custom domain can
/// only be created with an already issued certificate.
pub const PIPELINE: [StageDescriptor; 12] = [
    StageDescriptor {
        stage: Stage::Bucket,
        description: "Create the origin bucket",
        applies: any_mode,
        tracks: Some(ResourceKind::S3Bucket),
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::WebsiteHosting,
        description: "Enable public website hosting",
        applies: website_mode,
        tracks: None,
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::OriginAccessControl,
        description: "Create the origin access control",
        applies: cdn_mode,
        tracks: Some(ResourceKind::CloudFrontOac),
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::Certificate,
        description: "Request the TLS certificate",
        applies: domain_mode,
        tracks: Some(ResourceKind::AcmCertificate),
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::ValidationRecord,
        description: "Publish the certificate validation record",
        applies: domain_mode,
        tracks: Some(ResourceKind::Route53ValidationRecord),
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::CertificateIssued,
        description: "Wait for the certificate to be issued",
        applies: domain_mode,
        tracks: None,
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::Distribution,
        description: "Create the CloudFront distribution",
        applies: cdn_mode,
        tracks: Some(ResourceKind::CloudFrontDistribution),
        requires_confirmation: true,
    },
    StageDescriptor {
        stage: Stage::DistributionAccess,
        description: "Restrict bucket reads to the distribution",
        applies: cdn_mode,
        tracks: None,
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::AttachCertificate,
        description: "Serve the domain from the distribution",
        applies: domain_mode,
        tracks: None,
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::Upload,
        description: "Upload the build output",
        applies: any_mode,
        tracks: None,
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::AliasRecord,
        description: "Point the domain at the distribution",
        applies: domain_mode,
        tracks: Some(ResourceKind::Route53AliasRecord),
        requires_confirmation: false,
    },
    StageDescriptor {
        stage: Stage::Invalidation,
        description: "Invalidate cached content",
        applies: cdn_mode,
        tracks: None,
        requires_confirmation: false,
    },
];

impl StageDescriptor {
    /// Decides whether the stage runs against the current record.
    ///
    /// `distribution_existed` is whether the record named a distribution when
    /// the run started.
    #[must_use]
    pub fn decide(
        &self,
        mode: &DeployMode,
        state: &DeploymentState,
        distribution_existed: bool,
    ) -> StageDecision {
        if !(self.applies)(mode) {
            return StageDecision::Skip(SkipReason::NotApplicable);
        }
        if let Some(kind) = self.tracks {
            if state.tracks(kind) {
                return StageDecision::Skip(SkipReason::AlreadyCreated(kind));
            }
        }

        match self.stage {
            Stage::CertificateIssued | Stage::AttachCertificate if certificate_attached(state) => {
                StageDecision::Skip(SkipReason::CertificateAttached)
            }
            Stage::Invalidation if !distribution_existed => {
                StageDecision::Skip(SkipReason::FirstDeployment)
            }
            _ => StageDecision::Run,
        }
    }
}

/// An attached certificate was necessarily issued.
fn certificate_attached(state: &DeploymentState) -> bool {
    state.cloudfront_distribution_id.is_some()
        && state.cloudfront_certificate_arn.is_some()
        && state.cloudfront_certificate_arn == state.acm_certificate_arn
}
