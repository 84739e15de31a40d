//! spa-deploy CLI entrypoint.
//!
//! This is the main entrypoint for the spa-deploy command-line tool.

use std::path::Path;
use std::process::ExitCode;

use spa_deploy::build::{BuildRunner, detect_output_dir};
use spa_deploy::cli::{Cli, OutputFormatter};
use spa_deploy::config::{ConfigParser, ConfigValidator, DeployConfig};
use spa_deploy::confirm::{AutoApprove, ConfirmationGate, StdinConfirmation};
use spa_deploy::error::Result;
use spa_deploy::pipeline::{PipelineOutcome, ProvisioningPipeline};
use spa_deploy::planner::ProvisioningPlan;
use spa_deploy::provider::aws::load_providers;
use spa_deploy::state::{DeploymentState, LocalStateStore, StateStore};
use spa_deploy::teardown::{TeardownOrchestrator, TeardownOutcome};

use colored::Colorize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "Error:".red().bold());
            if e.is_resumable() {
                eprintln!("Progress so far is recorded. Run the same command again to resume.");
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.format);
    let mut config = load_config(&cli)?;
    let store = LocalStateStore::for_project(&config.project_dir);
    let recorded = store.load().await?;
    ConfigValidator::match_record(&mut config, recorded.as_ref())?;

    let gate: Box<dyn ConfirmationGate> = if cli.yes {
        Box::new(AutoApprove)
    } else {
        Box::new(StdinConfirmation)
    };

    if cli.plan {
        cmd_plan(&config, recorded.as_ref(), &formatter);
        Ok(())
    } else if cli.destroy {
        cmd_destroy(&config, &store, gate.as_ref(), &formatter).await
    } else {
        cmd_deploy(&config, &store, gate.as_ref(), &formatter).await
    }
}

/// Resolves flags, the project file and `.env` into a validated configuration.
fn load_config(cli: &Cli) -> Result<DeployConfig> {
    let parser = ConfigParser::new(&cli.dir);
    parser.ensure_project_dir()?;
    parser.load_dotenv()?;

    let file = parser.load_project_file()?;
    let config = ConfigParser::resolve(cli.overrides(), file)?;

    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    debug!("Resolved configuration: {config:?}");
    Ok(config)
}

/// Show what a deployment would do.
fn cmd_plan(
    config: &DeployConfig,
    state: Option<&DeploymentState>,
    formatter: &OutputFormatter,
) {
    let plan = ProvisioningPlan::build(config, state);
    println!("{}", formatter.format_plan(&plan));
    println!("{}", formatter.format_state(state));
}

/// Build, provision and upload.
async fn cmd_deploy(
    config: &DeployConfig,
    store: &LocalStateStore,
    gate: &dyn ConfirmationGate,
    formatter: &OutputFormatter,
) -> Result<()> {
    if config.skip_build {
        info!("Skipping build");
    } else {
        BuildRunner::new(&config.project_dir, config.build_command.as_deref())
            .run()
            .await?;
    }

    let output_dir = detect_output_dir(&config.project_dir, config.output_dir.as_deref())?;
    info!("Using build output in {}", display_relative(&output_dir, &config.project_dir));

    let providers = load_providers(&config.region).await;
    let pipeline = ProvisioningPipeline::new(config, &providers, store, gate);

    match pipeline.run(&output_dir).await? {
        PipelineOutcome::Completed(report) => println!("{}", formatter.format_report(&report)),
        PipelineOutcome::Cancelled => eprintln!("Deployment cancelled."),
    }
    Ok(())
}

/// Delete everything the deployment created.
async fn cmd_destroy(
    config: &DeployConfig,
    store: &LocalStateStore,
    gate: &dyn ConfirmationGate,
    formatter: &OutputFormatter,
) -> Result<()> {
    let providers = load_providers(&config.region).await;
    let orchestrator = TeardownOrchestrator::new(config, &providers, store, gate);

    match orchestrator.run().await? {
        TeardownOutcome::Completed(report) => println!("{}", formatter.format_teardown(&report)),
        TeardownOutcome::NothingToDo => {
            eprintln!("Nothing to destroy: no deployment record in {}", store.location());
        }
        TeardownOutcome::Cancelled => eprintln!("Destroy cancelled."),
    }
    Ok(())
}

fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
