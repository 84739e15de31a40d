//! Configuration types.
//!
//! [`ProjectFile`] maps `spa-deploy.yaml`, [`CliOverrides`] carries the raw
//! command-line values and [`DeployConfig`] is the merged result every other
//! module consumes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::poller::PollConfig;

/// Region used when neither the command line nor the project file names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default number of concurrent uploads.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 8;

/// Optional per-project settings read from `spa-deploy.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    /// Bucket region.
    #[serde(default)]
    pub region: Option<String>,
    /// Serve through CloudFront.
    #[serde(default)]
    pub cloudfront: Option<bool>,
    /// Custom domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Build output directory, relative to the project.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Build command replacing `<package manager> run build`.
    #[serde(default)]
    pub build_command: Option<String>,
    /// Maximum concurrent uploads.
    #[serde(default)]
    pub upload_concurrency: Option<usize>,
    /// Polling overrides.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Backoff settings for each asynchronous wait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Certificate validation metadata and issuance.
    #[serde(default = "PollConfig::certificate")]
    pub certificate: PollConfig,
    /// Distribution changes reaching `Deployed`.
    #[serde(default = "PollConfig::distribution")]
    pub distribution: PollConfig,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            certificate: PollConfig::certificate(),
            distribution: PollConfig::distribution(),
        }
    }
}

/// Values given on the command line (or through `SPA_DEPLOY_*` variables).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Bucket name.
    pub bucket: String,
    /// Bucket region.
    pub region: Option<String>,
    /// `--cloudfront` was passed.
    pub cloudfront: bool,
    /// Custom domain.
    pub domain: Option<String>,
    /// Project directory.
    pub project_dir: PathBuf,
    /// Build output directory.
    pub output: Option<PathBuf>,
    /// Skip the build step.
    pub skip_build: bool,
}

/// How the site is served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeployMode {
    /// Public S3 static website hosting.
    S3Website,
    /// Private bucket behind a CloudFront distribution.
    Cdn,
    /// CloudFront with a custom domain, certificate and DNS records.
    CustomDomain {
        /// The domain served.
        domain: String,
    },
}

impl DeployMode {
    /// Returns true if a distribution fronts the bucket.
    #[must_use]
    pub const fn uses_cdn(&self) -> bool {
        matches!(self, Self::Cdn | Self::CustomDomain { .. })
    }

    /// Returns the custom domain, if any.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::CustomDomain { domain } => Some(domain),
            Self::S3Website | Self::Cdn => None,
        }
    }
}

impl std::fmt::Display for DeployMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::S3Website => write!(f, "S3 website"),
            Self::Cdn => write!(f, "CloudFront"),
            Self::CustomDomain { domain } => write!(f, "CloudFront + {domain}"),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployConfig {
    /// Bucket name.
    pub bucket: String,
    /// Bucket region.
    pub region: String,
    /// The region came from a flag or the project file rather than the default.
    pub region_explicit: bool,
    /// Serving mode.
    pub mode: DeployMode,
    /// Project directory holding the sources and the state file.
    pub project_dir: PathBuf,
    /// Explicit build output directory.
    pub output_dir: Option<PathBuf>,
    /// Skip the build step.
    pub skip_build: bool,
    /// Build command override.
    pub build_command: Option<String>,
    /// Maximum concurrent uploads.
    pub upload_concurrency: usize,
    /// Backoff settings.
    pub polling: PollingConfig,
}

impl DeployConfig {
    /// Creates a configuration with defaults for everything but the bucket.
    #[must_use]
    pub fn new(bucket: &str, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.to_string(),
            region: String::from(DEFAULT_REGION),
            region_explicit: false,
            mode: DeployMode::S3Website,
            project_dir: project_dir.into(),
            output_dir: None,
            skip_build: false,
            build_command: None,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            polling: PollingConfig::default(),
        }
    }

    /// Sets the serving mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DeployMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the bucket region.
    #[must_use]
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self.region_explicit = true;
        self
    }

    /// Takes the region from an existing deployment record unless one was
    /// given explicitly. Returns true if the region changed.
    pub fn adopt_recorded_region(&mut self, recorded: &str) -> bool {
        if self.region_explicit || self.region == recorded {
            return false;
        }
        self.region = recorded.to_string();
        true
    }
}
