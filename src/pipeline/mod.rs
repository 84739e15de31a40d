//! The provisioning pipeline.
//!
//! Stages run strictly in [`PIPELINE`] order. Before each stage the record is
//! read again and the stage is skipped if the resource it creates is already
//! tracked; after each stage that ran, the record is written back. A run that
//! fails halfway can therefore be repeated and resumes at the failed stage.

mod policy;
mod stages;

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ConfigValidator, DeployConfig};
use crate::confirm::ConfirmationGate;
use crate::error::{ProvisionError, Result};
use crate::planner::{PIPELINE, ProvisioningPlan, Stage, StageDecision};
use crate::provider::Providers;
use crate::state::{DeploymentState, ResourceKind, StateStore};

/// How a provisioning run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Every applicable stage ran or was already satisfied.
    Completed(ProvisioningReport),
    /// The user declined the confirmation prompt. Nothing was changed.
    Cancelled,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningReport {
    /// Bucket deployed to.
    pub bucket: String,
    /// Serving mode, as displayed.
    pub mode: String,
    /// Every stage in order.
    pub stages: Vec<StageReport>,
    /// Number of files uploaded.
    pub uploaded_files: usize,
    /// Invalidation created on a redeploy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation_id: Option<String>,
    /// Where the site is served.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    /// Resources this tool owns after the run.
    pub created_resources: Vec<ResourceKind>,
}

/// Outcome of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// The stage.
    pub stage: Stage,
    /// Whether it ran.
    pub ran: bool,
    /// What it did, or why it was skipped.
    pub detail: String,
}

/// Per-run values that are not part of the record.
#[derive(Debug)]
struct RunContext {
    output_dir: PathBuf,
    uploaded_files: usize,
    invalidation_id: Option<String>,
}

/// Drives a deployment through the pipeline stages.
pub struct ProvisioningPipeline<'a> {
    config: &'a DeployConfig,
    providers: &'a Providers,
    store: &'a dyn StateStore,
    gate: &'a dyn ConfirmationGate,
}

impl<'a> ProvisioningPipeline<'a> {
    /// Creates a pipeline.
    #[must_use]
    pub const fn new(
        config: &'a DeployConfig,
        providers: &'a Providers,
        store: &'a dyn StateStore,
        gate: &'a dyn ConfirmationGate,
    ) -> Self {
        Self {
            config,
            providers,
            store,
            gate,
        }
    }

    /// Loads the record, rejecting one written for another bucket or region.
    async fn load_state(&self) -> Result<Option<DeploymentState>> {
        let state = self.store.load().await?;
        if let Some(state) = &state {
            ConfigValidator::check_identity(self.config, state)?;
        }
        Ok(state)
    }

    /// Runs every stage, uploading the files in `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::StageFailed`] naming the first stage that
    /// failed, or a state or configuration error. Stages completed before the
    /// failure stay recorded.
    pub async fn run(&self, output_dir: &Path) -> Result<PipelineOutcome> {
        let initial = self.load_state().await?;
        let plan = ProvisioningPlan::build(self.config, initial.as_ref());
        let distribution_existed = initial
            .as_ref()
            .is_some_and(|s| s.cloudfront_distribution_id.is_some());

        if plan.requires_confirmation {
            let prompt = format!(
                "This will create a CloudFront distribution for s3://{} \
                 (billable, takes several minutes). Continue?",
                self.config.bucket
            );
            if !self.gate.confirm(&prompt)? {
                info!("Deployment cancelled");
                return Ok(PipelineOutcome::Cancelled);
            }
        }

        info!("Deploying {} ({})", self.config.bucket, self.config.mode);

        let mut run = RunContext {
            output_dir: output_dir.to_path_buf(),
            uploaded_files: 0,
            invalidation_id: None,
        };
        let mut stages = Vec::with_capacity(PIPELINE.len());
        let total = PIPELINE.len();

        for (index, descriptor) in PIPELINE.iter().enumerate() {
            let mut state = self
                .store
                .load()
                .await?
                .unwrap_or_else(|| DeploymentState::new(&self.config.bucket, &self.config.region));

            match descriptor.decide(&self.config.mode, &state, distribution_existed) {
                StageDecision::Skip(reason) => {
                    debug!("[{}/{total}] {}: skipped ({reason})", index + 1, descriptor.stage);
                    stages.push(StageReport {
                        stage: descriptor.stage,
                        ran: false,
                        detail: reason.to_string(),
                    });
                }
                StageDecision::Run => {
                    info!("[{}/{total}] {}", index + 1, descriptor.description);
                    let detail = self
                        .execute(descriptor.stage, &mut state, &mut run)
                        .await
                        .map_err(|e| ProvisionError::stage_failed(descriptor.stage, e))?;

                    state.touch();
                    self.store.save(&state).await?;
                    stages.push(StageReport {
                        stage: descriptor.stage,
                        ran: true,
                        detail,
                    });
                }
            }
        }

        let state = self.store.load().await?;
        let report = ProvisioningReport {
            bucket: self.config.bucket.clone(),
            mode: self.config.mode.to_string(),
            stages,
            uploaded_files: run.uploaded_files,
            invalidation_id: run.invalidation_id,
            site_url: state.as_ref().and_then(DeploymentState::site_url),
            created_resources: state.map(|s| s.created_resources).unwrap_or_default(),
        };

        info!("Deployment complete");
        Ok(PipelineOutcome::Completed(report))
    }
}
