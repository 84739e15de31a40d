//! CLI argument definitions.
//!
//! Every flag can also be set through a `SPA_DEPLOY_*` environment variable.

use clap::Parser;
use std::path::PathBuf;

use crate::config::CliOverrides;

/// spa-deploy - Build a single-page app and host it on S3, optionally behind
/// CloudFront with a custom domain.
#[derive(Parser, Debug)]
#[command(name = "spa-deploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Name of the S3 bucket hosting the site.
    #[arg(short, long, env = "SPA_DEPLOY_BUCKET")]
    pub bucket: String,

    /// Serve the site through a CloudFront distribution.
    #[arg(long, env = "SPA_DEPLOY_CLOUDFRONT")]
    pub cloudfront: bool,

    /// Custom domain served by the distribution.
    #[arg(long, env = "SPA_DEPLOY_DOMAIN", requires = "cloudfront")]
    pub domain: Option<String>,

    /// AWS region of the bucket [default: us-east-1].
    #[arg(short, long, env = "SPA_DEPLOY_REGION")]
    pub region: Option<String>,

    /// Project directory.
    #[arg(short, long, env = "SPA_DEPLOY_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Build output directory (defaults to dist/ or build/).
    #[arg(short, long, env = "SPA_DEPLOY_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Upload the existing build output without building.
    #[arg(long, env = "SPA_DEPLOY_SKIP_BUILD")]
    pub skip_build: bool,

    /// Delete every resource this tool created for the project.
    #[arg(long, conflicts_with = "plan")]
    pub destroy: bool,

    /// Do not ask for confirmation.
    #[arg(short, long, env = "SPA_DEPLOY_YES")]
    pub yes: bool,

    /// Print what a deployment would do and exit.
    #[arg(long)]
    pub plan: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, env = "SPA_DEPLOY_FORMAT", default_value = "text")]
    pub format: OutputFormat,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the settings that take precedence over the project file.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            cloudfront: self.cloudfront,
            domain: self.domain.clone(),
            project_dir: self.dir.clone(),
            output: self.output.clone(),
            skip_build: self.skip_build,
        }
    }
}
