// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # spa-deploy
//!
//! Idempotent provisioning and teardown of AWS hosting for single-page apps.
//!
//! ## Overview
//!
//! One command builds the project and serves it from S3, either as a public
//! website or privately behind CloudFront, optionally under a custom domain
//! with an ACM certificate and Route53 records. Running the command again
//! only uploads and invalidates; `--destroy` removes exactly what was created.
//!
//! ## Architecture
//!
//! Everything the tool knows about a deployment lives in one record,
//! `spa_deploy.json`, next to the project:
//!
//! 1. **Record**: which resources exist and which of them this tool created
//! 2. **Pipeline**: ordered stages, each skipped when its resource is recorded
//! 3. **Teardown**: deletes recorded resources in reverse, one at a time
//!
//! The record is rewritten after every step, so an interrupted run resumes
//! where it stopped.
//!
//! ## Modules
//!
//! - [`config`]: Flags, project file and validation
//! - [`state`]: The deployment record and its storage
//! - [`provider`]: Cloud capability traits and their AWS implementations
//! - [`planner`]: Stage ordering and plan previews
//! - [`pipeline`]: Provisioning
//! - [`teardown`]: Deletion of created resources
//! - [`poller`]: Waiting for certificates and distributions
//! - [`build`] and [`upload`]: Building the app and uploading its output
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! # spa-deploy.yaml
//! region: eu-west-1
//! cloudfront: true
//! domain: app.example.com
//! build_command: npm run build:prod
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod build;
pub mod cli;
pub mod config;
pub mod confirm;
pub mod error;
pub mod pipeline;
pub mod planner;
pub mod poller;
pub mod provider;
pub mod state;
pub mod teardown;
pub mod upload;
pub mod zone;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, DeployConfig, DeployMode};
pub use error::{Result, SpaDeployError};
pub use pipeline::{PipelineOutcome, ProvisioningPipeline, ProvisioningReport};
pub use planner::ProvisioningPlan;
pub use provider::Providers;
pub use state::{DeploymentState, LocalStateStore, StateStore};
pub use teardown::{TeardownOrchestrator, TeardownOutcome};
