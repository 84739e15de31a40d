//! Running the project's build and locating its output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{BuildError, Result};

/// Output directories probed in order when none is given.
pub const OUTPUT_CANDIDATES: &[&str] = &["dist", "build"];

/// JavaScript package managers, detected from their lockfiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// `npm`, the fallback.
    Npm,
    /// `yarn`, when `yarn.lock` exists.
    Yarn,
    /// `pnpm`, when `pnpm-lock.yaml` exists.
    Pnpm,
}

impl PackageManager {
    /// Detects the package manager used by a project.
    #[must_use]
    pub fn detect(project_dir: &Path) -> Self {
        if project_dir.join("yarn.lock").exists() {
            Self::Yarn
        } else if project_dir.join("pnpm-lock.yaml").exists() {
            Self::Pnpm
        } else {
            Self::Npm
        }
    }

    /// Executable name.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
        }
    }
}

/// Runs the build in a project directory.
#[derive(Debug, Clone)]
pub struct BuildRunner {
    project_dir: PathBuf,
    command: Vec<String>,
}

impl BuildRunner {
    /// Creates a runner using `<package manager> run build`, or the given
    /// command line split on whitespace.
    #[must_use]
    pub fn new(project_dir: &Path, command_override: Option<&str>) -> Self {
        let command = command_override.map_or_else(
            || {
                let pm = PackageManager::detect(project_dir);
                vec![pm.program().to_string(), String::from("run"), String::from("build")]
            },
            |line| line.split_whitespace().map(str::to_string).collect(),
        );

        Self {
            project_dir: project_dir.to_path_buf(),
            command,
        }
    }

    /// Returns the command line as displayed.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Runs the build, inheriting stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns a build error if the command cannot start or exits non-zero.
    pub async fn run(&self) -> Result<()> {
        let command_line = self.command_line();
        let Some((program, args)) = self.command.split_first() else {
            return Err(BuildError::SpawnFailed {
                command: command_line,
                message: String::from("empty build command"),
            }
            .into());
        };

        info!("Running: {command_line}");
        let status = Command::new(program)
            .args(args)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| BuildError::SpawnFailed {
                command: command_line.clone(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(BuildError::CommandFailed {
                command: command_line,
                status: status.to_string(),
            }
            .into());
        }

        debug!("Build finished: {status}");
        Ok(())
    }
}

/// Returns the explicit output directory, or the first existing candidate.
///
/// # Errors
///
/// Returns [`BuildError::OutputNotFound`] if nothing exists.
pub fn detect_output_dir(project_dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        if dir.is_dir() {
            return Ok(dir.to_path_buf());
        }
        return Err(BuildError::OutputNotFound {
            searched: dir.to_path_buf(),
        }
        .into());
    }

    OUTPUT_CANDIDATES
        .iter()
        .map(|candidate| project_dir.join(candidate))
        .find(|dir| dir.is_dir())
        .ok_or_else(|| {
            BuildError::OutputNotFound {
                searched: project_dir.to_path_buf(),
            }
            .into()
        })
}
