//! State management module for the SPA deployment system.
//!
//! This module provides persistent storage of the deployment record: which
//! resources exist, their identifiers, and which of them this tool created.

mod store;
mod local;
mod types;

pub use local::{LocalStateStore, STATE_FILE};
pub use store::StateStore;
pub use types::{DeploymentState, ResourceKind, STATE_VERSION, ValidationRecord};
