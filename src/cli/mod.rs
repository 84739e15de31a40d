//! CLI module for the spa-deploy tool.
//!
//! This module provides the command-line flags and the rendering of plans,
//! reports and the deployment record.

mod commands;
mod output;

pub use commands::{Cli, OutputFormat};
pub use output::OutputFormatter;
