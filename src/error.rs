//! Error types for the SPA deployment system.
//!
//! This module provides the error hierarchy for every phase of a deploy:
//! configuration, build, state management, provider calls, provisioning and
//! teardown.

use std::path::PathBuf;
use thiserror::Error;

use crate::planner::Stage;
use crate::state::ResourceKind;

/// The main error type for the SPA deployment system.
#[derive(Debug, Error)]
pub enum SpaDeployError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Cloud provider errors.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Provisioning and teardown errors.
    #[error("{0}")]
    Provision(#[from] ProvisionError),

    /// Build errors.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The project directory does not exist.
    #[error("Project directory not found: {path}")]
    ProjectDirNotFound {
        /// Path to the missing directory.
        path: PathBuf,
    },

    /// The project file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// The state record belongs to a different bucket or region.
    #[error("State file tracks {field} '{recorded}', but this run targets '{requested}'")]
    IdentityMismatch {
        /// Which identity field differs (`bucket` or `region`).
        field: String,
        /// Value stored in the state record.
        recorded: String,
        /// Value requested on this run.
        requested: String,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State file {path} is corrupted: {message}")]
    Corrupted {
        /// Path to the unreadable state file.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    /// Writing the state file failed.
    #[error("Failed to write state file {path}: {message}")]
    WriteFailed {
        /// Path to the state file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version is newer than this tool understands.
    #[error("State version mismatch: supported up to {supported}, found {found}")]
    VersionMismatch {
        /// Highest supported state version.
        supported: u32,
        /// Found state version.
        found: u32,
    },
}

/// Cloud provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A provider API call failed.
    #[error("{service} {operation} failed: {message}")]
    RequestFailed {
        /// Provider service (s3, cloudfront, acm, route53).
        service: &'static str,
        /// Operation that failed.
        operation: &'static str,
        /// Error message from the provider.
        message: String,
    },

    /// The provider returned a response missing required data.
    #[error("Invalid response from {service}: {message}")]
    InvalidResponse {
        /// Provider service.
        service: &'static str,
        /// Description of the response issue.
        message: String,
    },

    /// A resource referenced by the state record does not exist.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource description.
        resource: String,
        /// Resource identifier.
        id: String,
    },

    /// The certificate authority refused to issue the certificate.
    #[error("Certificate {arn} reached status {status}: {reason}")]
    CertificateFailed {
        /// Certificate ARN.
        arn: String,
        /// Terminal status reported.
        status: String,
        /// Failure reason reported by the authority.
        reason: String,
    },
}

/// Provisioning and teardown errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No hosted zone owns the requested domain.
    #[error("No hosted zone found for {domain}")]
    ZoneNotFound {
        /// Domain that could not be resolved.
        domain: String,
    },

    /// An asynchronous resource did not reach the required status in time.
    #[error("Timed out after {waited_secs}s waiting for {resource} (last status: {last_status})")]
    Timeout {
        /// Resource being waited on.
        resource: String,
        /// Last status observed from the provider.
        last_status: String,
        /// Seconds spent waiting.
        waited_secs: u64,
    },

    /// A pipeline stage failed; later stages were not attempted.
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        /// Stage that failed.
        stage: Stage,
        /// Underlying error.
        source: Box<SpaDeployError>,
    },

    /// Teardown finished with resources still tracked.
    #[error("Teardown incomplete, still tracked: {}", format_kinds(.remaining))]
    TeardownIncomplete {
        /// Resource kinds that could not be deleted.
        remaining: Vec<ResourceKind>,
    },
}

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The build command could not be started.
    #[error("Failed to run '{command}': {message}")]
    SpawnFailed {
        /// Command line.
        command: String,
        /// Description of the failure.
        message: String,
    },

    /// The build command exited unsuccessfully.
    #[error("'{command}' exited with {status}")]
    CommandFailed {
        /// Command line.
        command: String,
        /// Exit status description.
        status: String,
    },

    /// No build output directory could be found.
    #[error("Build output directory not found in {searched}. Use --output to specify it.")]
    OutputNotFound {
        /// Directory that was searched.
        searched: PathBuf,
    },
}

/// Result type alias for SPA deployment operations.
pub type Result<T> = std::result::Result<T, SpaDeployError>;

fn format_kinds(kinds: &[ResourceKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SpaDeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if re-running the same command can make progress.
    ///
    /// Timeouts, provider failures and incomplete teardowns leave a state record
    /// consistent with what exists, so the next run resumes where this one stopped.
    /// A failed certificate stays failed; it has to be torn down first.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        match self {
            Self::Provider(ProviderError::CertificateFailed { .. }) => false,
            Self::Provider(_)
            | Self::Provision(
                ProvisionError::Timeout { .. } | ProvisionError::TeardownIncomplete { .. },
            ) => true,
            Self::Provision(ProvisionError::StageFailed { source, .. }) => source.is_resumable(),
            _ => false,
        }
    }

    /// Returns the pipeline stage that failed, if this error came from one.
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Provision(ProvisionError::StageFailed { stage, .. }) => Some(*stage),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl StateError {
    /// Creates a corruption error for the given state file.
    #[must_use]
    pub fn corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupted {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a write error for the given state file.
    #[must_use]
    pub fn write_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl ProviderError {
    /// Creates a request failure for a provider operation.
    #[must_use]
    pub fn request(
        service: &'static str,
        operation: &'static str,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::RequestFailed {
            service,
            operation,
            message: message.to_string(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}

impl ProvisionError {
    /// Wraps an error with the stage it came from.
    #[must_use]
    pub fn stage_failed(stage: Stage, source: SpaDeployError) -> Self {
        Self::StageFailed {
            stage,
            source: Box::new(source),
        }
    }
}
