//! Planning module for provisioning runs.
//!
//! This module declares the ordered pipeline stages, decides per stage whether
//! it runs against the current record, and previews a whole run as a plan.

mod plan;
mod stage;

pub use plan::{PlannedStage, ProvisioningPlan};
pub use stage::{PIPELINE, SkipReason, Stage, StageDecision, StageDescriptor};
