//! Output formatting for CLI commands.
//!
//! Plans, reports and the deployment record are rendered either as coloured
//! text with tables or as pretty-printed JSON.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::pipeline::ProvisioningReport;
use crate::planner::ProvisioningPlan;
use crate::state::DeploymentState;
use crate::teardown::TeardownReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan step row for table display.
#[derive(Tabled)]
struct PlanStepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Stage result row for table display.
#[derive(Tabled)]
struct StageResultRow {
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Record field row for table display.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a provisioning plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ProvisioningPlan) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(plan).unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &ProvisioningPlan) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "\nDeployment plan for s3://{} ({})\n", plan.bucket, plan.mode);

        let rows: Vec<PlanStepRow> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| PlanStepRow {
                index: i + 1,
                stage: step.stage.to_string(),
                action: if step.run {
                    "run".green().to_string()
                } else {
                    "skip".dimmed().to_string()
                },
                details: step
                    .skip_reason
                    .map_or_else(|| step.description.to_string(), |reason| reason.to_string()),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let running = plan.runnable().count();
        let _ = write!(output, "\nPlan: {} stages to run", running.to_string().green());
        if plan.requires_confirmation {
            let _ = write!(
                output,
                "\n{} A CloudFront distribution will be created (confirmation required)",
                "!".yellow()
            );
        }
        output.push('\n');
        output
    }

    /// Formats the result of a deployment.
    #[must_use]
    pub fn format_report(&self, report: &ProvisioningReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    fn format_report_text(report: &ProvisioningReport) -> String {
        let mut output = String::new();

        let rows: Vec<StageResultRow> = report
            .stages
            .iter()
            .filter(|s| s.ran)
            .map(|s| StageResultRow {
                stage: s.stage.to_string(),
                result: "done".green().to_string(),
                details: s.detail.clone(),
            })
            .collect();

        let _ = writeln!(output, "\nDeployed s3://{} ({})\n", report.bucket, report.mode);
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = writeln!(output, "\nUploaded {} files", report.uploaded_files);
        if let Some(id) = &report.invalidation_id {
            let _ = writeln!(output, "Invalidation: {id}");
        }
        if let Some(url) = &report.site_url {
            let _ = writeln!(output, "{} {}", "Site:".bold(), url.cyan());
        }
        output
    }

    /// Formats the result of a teardown.
    #[must_use]
    pub fn format_teardown(&self, report: &TeardownReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "\nDestroyed deployment of s3://{}\n", report.bucket);
                for kind in &report.deleted {
                    let _ = writeln!(output, "  {} {}", "deleted".red(), kind.description());
                }
                for kind in &report.already_gone {
                    let _ = writeln!(output, "  {} {}", "gone".dimmed(), kind.description());
                }
                if report.deleted.is_empty() && report.already_gone.is_empty() {
                    output.push_str("  Nothing was tracked.\n");
                }
                output
            }
        }
    }

    /// Formats the deployment record.
    #[must_use]
    pub fn format_state(&self, state: Option<&DeploymentState>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&state).unwrap_or_default(),
            OutputFormat::Text => state.map_or_else(
                || String::from("\nNo deployment record yet.\n"),
                Self::format_state_text,
            ),
        }
    }

    fn format_state_text(state: &DeploymentState) -> String {
        let optional = |value: Option<&String>| value.cloned().unwrap_or_else(|| String::from("-"));

        let rows = vec![
            FieldRow {
                field: "Bucket",
                value: state.bucket_name.clone(),
            },
            FieldRow {
                field: "Region",
                value: state.region.clone(),
            },
            FieldRow {
                field: "Website URL",
                value: optional(state.s3_website_url.as_ref()),
            },
            FieldRow {
                field: "Distribution",
                value: optional(state.cloudfront_distribution_id.as_ref()),
            },
            FieldRow {
                field: "Distribution domain",
                value: optional(state.cloudfront_domain.as_ref()),
            },
            FieldRow {
                field: "Domain",
                value: optional(state.domain.as_ref()),
            },
            FieldRow {
                field: "Certificate",
                value: optional(state.acm_certificate_arn.as_ref()),
            },
            FieldRow {
                field: "Hosted zone",
                value: optional(state.route53_zone_id.as_ref()),
            },
            FieldRow {
                field: "Created",
                value: state
                    .created_resources
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            },
            FieldRow {
                field: "Last updated",
                value: state
                    .last_updated
                    .map_or_else(|| String::from("-"), |t| t.to_rfc3339()),
            },
        ];

        format!("\nDeployment record\n\n{}\n", Table::new(rows))
    }
}
