//! Local file-based state storage backend.
//!
//! The record lives next to the project it deploys, so every project directory
//! carries its own independent deployment.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, StateError};

use super::store::StateStore;
use super::types::{DeploymentState, STATE_VERSION};

/// State file name inside the project directory.
pub const STATE_FILE: &str = "spa_deploy.json";

/// Local file-based state store.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    /// Path to the state file.
    state_path: PathBuf,
}

impl LocalStateStore {
    /// Creates a store for the record inside a project directory.
    #[must_use]
    pub fn for_project(project_dir: impl AsRef<Path>) -> Self {
        Self::with_state_path(project_dir.as_ref().join(STATE_FILE))
    }

    /// Creates a store from a custom state file path.
    #[must_use]
    pub fn with_state_path(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    /// Returns the path to the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.state_path
    }

    fn temp_path(&self) -> PathBuf {
        self.state_path.with_extension("json.tmp")
    }

    fn parse(&self, content: &str) -> Result<DeploymentState> {
        let state: DeploymentState = serde_json::from_str(content)
            .map_err(|e| StateError::corrupted(&self.state_path, e.to_string()))?;

        if state.version > STATE_VERSION {
            return Err(StateError::VersionMismatch {
                supported: STATE_VERSION,
                found: state.version,
            }
            .into());
        }
        if state.bucket_name.is_empty() {
            return Err(StateError::corrupted(&self.state_path, "bucket_name is empty").into());
        }

        Ok(state)
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<DeploymentState>> {
        if !fs::try_exists(&self.state_path).await? {
            debug!("State file does not exist: {}", self.state_path.display());
            return Ok(None);
        }

        debug!("Loading state from: {}", self.state_path.display());

        let content = fs::read_to_string(&self.state_path)
            .await
            .map_err(|e| StateError::corrupted(&self.state_path, format!("unreadable: {e}")))?;

        self.parse(&content).map(Some)
    }

    async fn save(&self, state: &DeploymentState) -> Result<()> {
        let content =
            serde_json::to_string_pretty(state).map_err(|e| StateError::SerializationError {
                message: format!("Failed to serialize state: {e}"),
            })?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StateError::write_failed(&temp_path, e.to_string()))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StateError::write_failed(&temp_path, e.to_string()))?;

        file.sync_all()
            .await
            .map_err(|e| StateError::write_failed(&temp_path, e.to_string()))?;

        fs::rename(&temp_path, &self.state_path)
            .await
            .map_err(|e| StateError::write_failed(&self.state_path, e.to_string()))?;

        debug!(
            "State saved to {} ({} tracked resources)",
            self.state_path.display(),
            state.created_resources.len()
        );
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        if fs::try_exists(&self.state_path).await? {
            info!("Removing state file: {}", self.state_path.display());
            fs::remove_file(&self.state_path)
                .await
                .map_err(|e| StateError::write_failed(&self.state_path, e.to_string()))?;
        }
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(fs::try_exists(&self.state_path).await?)
    }

    fn location(&self) -> String {
        self.state_path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpaDeployError;
    use crate::state::ResourceKind;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStateStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::for_project(temp_dir.path());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let mut state = DeploymentState::new("my-app", "us-east-1");
        state.track(ResourceKind::S3Bucket);
        store.save(&state).await.expect("Failed to save state");

        let loaded = store
            .load()
            .await
            .expect("Failed to load state")
            .expect("State should exist");

        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();

        let result = store.load().await.expect("Load should not fail");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_is_corrupt_not_absent() {
        let (store, _temp) = create_test_store();
        std::fs::write(store.path(), "{ not json").expect("write");

        let err = store.load().await.expect_err("Load should fail");
        assert!(matches!(
            err,
            SpaDeployError::State(StateError::Corrupted { .. })
        ));
    }

    #[tokio::test]
    async fn test_newer_version_is_rejected() {
        let (store, _temp) = create_test_store();
        std::fs::write(
            store.path(),
            r#"{"version": 99, "bucket_name": "b", "region": "us-east-1"}"#,
        )
        .expect("write");

        let err = store.load().await.expect_err("Load should fail");
        assert!(matches!(
            err,
            SpaDeployError::State(StateError::VersionMismatch { found: 99, .. })
        ));
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let (store, temp) = create_test_store();

        store
            .save(&DeploymentState::new("my-app", "us-east-1"))
            .await
            .expect("Failed to save state");

        let names: Vec<String> = std::fs::read_dir(temp.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![String::from(STATE_FILE)]);
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (store, _temp) = create_test_store();

        assert!(!store.exists().await.expect("exists check failed"));

        store
            .save(&DeploymentState::new("my-app", "us-east-1"))
            .await
            .expect("Failed to save state");
        assert!(store.exists().await.expect("exists check failed"));

        store.delete().await.expect("delete failed");
        assert!(!store.exists().await.expect("exists check failed"));
    }
}
