//! Side-effect-free preview of a provisioning run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DeployConfig;
use crate::state::DeploymentState;

use super::stage::{PIPELINE, SkipReason, Stage, StageDecision};

/// What a run would do, computed from the record alone.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningPlan {
    /// When the plan was computed.
    pub created_at: DateTime<Utc>,
    /// Bucket the plan targets.
    pub bucket: String,
    /// Serving mode, as displayed.
    pub mode: String,
    /// Every stage in execution order.
    pub steps: Vec<PlannedStage>,
    /// The run will ask before creating a distribution.
    pub requires_confirmation: bool,
}

/// A stage and whether it runs.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStage {
    /// The stage.
    pub stage: Stage,
    /// What the stage does.
    pub description: &'static str,
    /// Whether it runs.
    pub run: bool,
    /// Why it is skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl ProvisioningPlan {
    /// Computes the plan for a configuration and the current record.
    ///
    /// Stages that depend on live lookups (reuse of untracked resources) are
    /// shown as running; they only become no-ops at execution time.
    #[must_use]
    pub fn build(config: &DeployConfig, state: Option<&DeploymentState>) -> Self {
        let empty = DeploymentState::new(&config.bucket, &config.region);
        let state = state.unwrap_or(&empty);
        let distribution_existed = state.cloudfront_distribution_id.is_some();

        let steps: Vec<PlannedStage> = PIPELINE
            .iter()
            .map(|descriptor| {
                let decision = descriptor.decide(&config.mode, state, distribution_existed);
                PlannedStage {
                    stage: descriptor.stage,
                    description: descriptor.description,
                    run: decision == StageDecision::Run,
                    skip_reason: match decision {
                        StageDecision::Run => None,
                        StageDecision::Skip(reason) => Some(reason),
                    },
                }
            })
            .collect();

        let requires_confirmation = !distribution_existed
            && PIPELINE
                .iter()
                .zip(&steps)
                .any(|(descriptor, step)| step.run && descriptor.requires_confirmation);

        Self {
            created_at: Utc::now(),
            bucket: config.bucket.clone(),
            mode: config.mode.to_string(),
            steps,
            requires_confirmation,
        }
    }

    /// Returns the stages that will run.
    pub fn runnable(&self) -> impl Iterator<Item = Stage> + '_ {
        self.steps.iter().filter(|s| s.run).map(|s| s.stage)
    }

    /// Returns true if the given stage runs.
    #[must_use]
    pub fn runs(&self, stage: Stage) -> bool {
        self.steps.iter().any(|s| s.stage == stage && s.run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployMode;
    use crate::state::ResourceKind;

    #[test]
    fn test_first_cdn_deploy_needs_confirmation() {
        let config = DeployConfig::new("my-app", ".").with_mode(DeployMode::Cdn);
        let plan = ProvisioningPlan::build(&config, None);

        assert!(plan.requires_confirmation);
        let stages: Vec<Stage> = plan.runnable().collect();
        assert_eq!(
            stages,
            vec![
                Stage::Bucket,
                Stage::OriginAccessControl,
                Stage::Distribution,
                Stage::DistributionAccess,
                Stage::Upload,
            ]
        );
    }

    #[test]
    fn test_website_mode_never_needs_confirmation() {
        let config = DeployConfig::new("my-app", ".");
        let plan = ProvisioningPlan::build(&config, None);

        assert!(!plan.requires_confirmation);
        assert!(plan.runs(Stage::WebsiteHosting));
        assert!(!plan.runs(Stage::Distribution));
    }

    #[test]
    fn test_redeploy_plan_skips_created_resources() {
        let config = DeployConfig::new("my-app", ".").with_mode(DeployMode::Cdn);
        let mut state = DeploymentState::new("my-app", "us-east-1");
        state.track(ResourceKind::S3Bucket);
        state.track(ResourceKind::CloudFrontOac);
        state.track(ResourceKind::CloudFrontDistribution);
        state.cloudfront_distribution_id = Some(String::from("E1"));

        let plan = ProvisioningPlan::build(&config, Some(&state));

        assert!(!plan.requires_confirmation);
        let stages: Vec<Stage> = plan.runnable().collect();
        assert_eq!(
            stages,
            vec![Stage::DistributionAccess, Stage::Upload, Stage::Invalidation]
        );

        let json = serde_json::to_value(&plan).expect("serialize");
        assert_eq!(json["steps"][0]["stage"], "bucket");
        assert_eq!(json["steps"][0]["skip_reason"]["already_created"], "s3_bucket");
    }
}
