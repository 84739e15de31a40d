//! Configuration loading and merging.
//!
//! Precedence, highest first: command-line flags (and their `SPA_DEPLOY_*`
//! variables), the project file, built-in defaults.

use crate::error::{ConfigError, Result, SpaDeployError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{
    CliOverrides, DEFAULT_REGION, DEFAULT_UPLOAD_CONCURRENCY, DeployConfig, DeployMode,
    ProjectFile,
};

/// Project file name looked up in the project directory.
pub const PROJECT_FILE: &str = "spa-deploy.yaml";

/// Loads the project file and `.env`, then merges them with CLI values.
#[derive(Debug)]
pub struct ConfigParser {
    /// Project directory.
    project_dir: PathBuf,
}

impl ConfigParser {
    /// Creates a parser for a project directory.
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    /// Fails if the project directory does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProjectDirNotFound`].
    pub fn ensure_project_dir(&self) -> Result<()> {
        if self.project_dir.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::ProjectDirNotFound {
                path: self.project_dir.clone(),
            }
            .into())
        }
    }

    /// Loads `spa-deploy.yaml` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_project_file(&self) -> Result<Option<ProjectFile>> {
        let path = self.project_dir.join(PROJECT_FILE);
        if !path.exists() {
            debug!("No project file at {}", path.display());
            return Ok(None);
        }

        info!("Loading project settings from: {}", path.display());
        let content = std::fs::read_to_string(&path).map_err(|e| {
            SpaDeployError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        Self::parse_yaml(&content, Some(&path)).map(Some)
    }

    /// Parses a project file from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or has unknown keys.
    pub fn parse_yaml(content: &str, source: Option<&Path>) -> Result<ProjectFile> {
        if content.trim().is_empty() {
            return Ok(ProjectFile::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            let location = match (source, e.location()) {
                (Some(path), Some(loc)) => {
                    Some(format!("{}:{}:{}", path.display(), loc.line(), loc.column()))
                }
                (Some(path), None) => Some(path.display().to_string()),
                (None, Some(loc)) => Some(format!("line {}, column {}", loc.line(), loc.column())),
                (None, None) => None,
            };
            SpaDeployError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })
    }

    /// Loads `.env` from the project directory if present.
    ///
    /// Variables already set in the environment are not overridden.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self.project_dir.join(".env");

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                SpaDeployError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Merges CLI values over the project file.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a domain is requested without CloudFront.
    pub fn resolve(cli: CliOverrides, file: Option<ProjectFile>) -> Result<DeployConfig> {
        let file = file.unwrap_or_default();

        let cloudfront = cli.cloudfront || file.cloudfront.unwrap_or(false);
        let domain = cli
            .domain
            .or(file.domain)
            .map(|d| d.trim_end_matches('.').to_ascii_lowercase());

        let mode = match (cloudfront, domain) {
            (false, Some(domain)) => {
                return Err(ConfigError::validation(
                    format!("--domain {domain} requires --cloudfront"),
                    "domain",
                )
                .into());
            }
            (true, Some(domain)) => DeployMode::CustomDomain { domain },
            (true, None) => DeployMode::Cdn,
            (false, None) => DeployMode::S3Website,
        };

        let output_dir = cli.output.or(file.output).map(|dir| {
            if dir.is_absolute() {
                dir
            } else {
                cli.project_dir.join(dir)
            }
        });

        let region = cli.region.or(file.region);
        let config = DeployConfig {
            bucket: cli.bucket,
            region_explicit: region.is_some(),
            region: region.unwrap_or_else(|| String::from(DEFAULT_REGION)),
            mode,
            project_dir: cli.project_dir,
            output_dir,
            skip_build: cli.skip_build,
            build_command: file.build_command,
            upload_concurrency: file
                .upload_concurrency
                .unwrap_or(DEFAULT_UPLOAD_CONCURRENCY),
            polling: file.polling,
        };

        debug!(
            "Resolved configuration: bucket={}, region={}, mode={}",
            config.bucket, config.region, config.mode
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::PollConfig;
    use tempfile::TempDir;

    fn cli(bucket: &str) -> CliOverrides {
        CliOverrides {
            bucket: bucket.to_string(),
            project_dir: PathBuf::from("/work/site"),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn test_defaults_without_project_file() {
        let config = ConfigParser::resolve(cli("my-app"), None).expect("resolve");

        assert_eq!(config.bucket, "my-app");
        assert_eq!(config.region, DEFAULT_REGION);
        assert!(!config.region_explicit);
        assert_eq!(config.mode, DeployMode::S3Website);
        assert_eq!(config.upload_concurrency, DEFAULT_UPLOAD_CONCURRENCY);
        assert!(config.output_dir.is_none());
        assert_eq!(config.polling.distribution, PollConfig::distribution());
    }

    #[test]
    fn test_cli_wins_over_project_file() {
        let file = ConfigParser::parse_yaml(
            "region: eu-west-1\ncloudfront: true\ndomain: old.example.com\noutput: public\n",
            None,
        )
        .expect("parse");

        let mut overrides = cli("my-app");
        overrides.region = Some(String::from("eu-central-1"));
        overrides.domain = Some(String::from("App.Example.com."));

        let config = ConfigParser::resolve(overrides, Some(file)).expect("resolve");

        assert_eq!(config.region, "eu-central-1");
        assert!(config.region_explicit);
        assert_eq!(
            config.mode,
            DeployMode::CustomDomain {
                domain: String::from("app.example.com")
            }
        );
        assert_eq!(config.output_dir, Some(PathBuf::from("/work/site/public")));
    }

    #[test]
    fn test_domain_requires_cloudfront() {
        let mut overrides = cli("my-app");
        overrides.domain = Some(String::from("app.example.com"));

        let err = ConfigParser::resolve(overrides, None).expect_err("should fail");
        assert!(matches!(
            err,
            SpaDeployError::Config(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = ConfigParser::parse_yaml("cloudfront: [", Some(Path::new("spa-deploy.yaml")))
            .expect_err("should fail");

        match err {
            SpaDeployError::Config(ConfigError::ParseError { location, .. }) => {
                assert!(location.expect("location").starts_with("spa-deploy.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_project_file_from_directory() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(
            temp.path().join(PROJECT_FILE),
            "build_command: make site\nupload_concurrency: 2\n",
        )
        .expect("write");

        let parser = ConfigParser::new(temp.path());
        parser.ensure_project_dir().expect("dir exists");
        let file = parser
            .load_project_file()
            .expect("load")
            .expect("file present");

        assert_eq!(file.build_command.as_deref(), Some("make site"));
        assert_eq!(file.upload_concurrency, Some(2));
    }

    #[test]
    fn test_missing_project_dir() {
        let err = ConfigParser::new("/definitely/not/here")
            .ensure_project_dir()
            .expect_err("should fail");
        assert!(matches!(
            err,
            SpaDeployError::Config(ConfigError::ProjectDirNotFound { .. })
        ));
    }
}
