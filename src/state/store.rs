//! State store trait definition.
//!
//! This module defines the common interface for state storage backends.

use async_trait::async_trait;

use crate::error::Result;
use super::types::DeploymentState;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the deployment state.
    ///
    /// Returns `None` if no state exists yet. A record that exists but cannot be
    /// parsed is an error, never `None`.
    async fn load(&self) -> Result<Option<DeploymentState>>;

    /// Saves the deployment state, replacing the previous record atomically.
    async fn save(&self, state: &DeploymentState) -> Result<()>;

    /// Deletes the deployment state.
    async fn delete(&self) -> Result<()>;

    /// Checks if state exists.
    async fn exists(&self) -> Result<bool>;

    /// Gets a human-readable location of the record.
    fn location(&self) -> String;
}
