//! Configuration module.
//!
//! This module handles all configuration-related functionality:
//! - Parsing the optional `spa-deploy.yaml` project file
//! - Loading `.env` from the project directory
//! - Merging command-line values over the project file
//! - Validation of names and settings

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, PROJECT_FILE};
pub use spec::{
    CliOverrides, DEFAULT_REGION, DEFAULT_UPLOAD_CONCURRENCY, DeployConfig, DeployMode,
    PollingConfig, ProjectFile,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
