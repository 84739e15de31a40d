//! Configuration validation.
//!
//! Catches names the provider would reject before any resource is touched,
//! and checks that an existing state record belongs to this bucket.

use crate::error::{ConfigError, Result, SpaDeployError};
use crate::provider::aws::CERTIFICATE_REGION;
use crate::state::DeploymentState;
use tracing::{debug, info};

use super::spec::{DeployConfig, PollingConfig};
use crate::poller::PollConfig;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationResult {
    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        validate_bucket(&config.bucket, &mut result);
        validate_region(&config.region, &mut result);
        if let Some(domain) = config.mode.domain() {
            validate_domain(domain, &mut result);
            if config.region != CERTIFICATE_REGION {
                result.warnings.push(format!(
                    "The certificate for {domain} will be requested in {CERTIFICATE_REGION}, \
                     while the bucket lives in {}",
                    config.region
                ));
            }
        }
        if config.upload_concurrency == 0 {
            result.error("upload_concurrency", "upload_concurrency must be at least 1");
        }
        validate_polling(&config.polling, &mut result);

        if let Some(first) = result.errors.first() {
            return Err(SpaDeployError::Config(ConfigError::ValidationError {
                message: first.message.clone(),
                field: Some(first.field.clone()),
            }));
        }

        debug!("Configuration validation passed");
        Ok(result)
    }

    /// Aligns a configuration with an existing record before any provider is
    /// built: an unspecified region follows the record, then identity is checked.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IdentityMismatch`].
    pub fn match_record(config: &mut DeployConfig, state: Option<&DeploymentState>) -> Result<()> {
        let Some(state) = state else {
            return Ok(());
        };
        if config.adopt_recorded_region(&state.region) {
            info!("Using region {} from the deployment record", state.region);
        }
        Self::check_identity(config, state)
    }

    /// Fails if the state record was written for another bucket or region.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IdentityMismatch`].
    pub fn check_identity(config: &DeployConfig, state: &DeploymentState) -> Result<()> {
        if state.bucket_name != config.bucket {
            return Err(ConfigError::IdentityMismatch {
                field: String::from("bucket"),
                recorded: state.bucket_name.clone(),
                requested: config.bucket.clone(),
            }
            .into());
        }
        if state.region != config.region {
            return Err(ConfigError::IdentityMismatch {
                field: String::from("region"),
                recorded: state.region.clone(),
                requested: config.region.clone(),
            }
            .into());
        }
        Ok(())
    }
}

/// S3 bucket naming rules.
fn validate_bucket(bucket: &str, result: &mut ValidationResult) {
    const FIELD: &str = "bucket";

    if !(3..=63).contains(&bucket.len()) {
        result.error(FIELD, format!("Bucket name '{bucket}' must be 3-63 characters long"));
        return;
    }
    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        result.error(
            FIELD,
            format!(
                "Bucket name '{bucket}' may only contain lowercase letters, digits, hyphens and dots"
            ),
        );
        return;
    }

    let starts_ok = bucket.starts_with(|c: char| c.is_ascii_alphanumeric());
    let ends_ok = bucket.ends_with(|c: char| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        result.error(
            FIELD,
            format!("Bucket name '{bucket}' must start and end with a letter or digit"),
        );
    }
    if bucket.contains("..") {
        result.error(FIELD, format!("Bucket name '{bucket}' contains adjacent dots"));
    }
    if bucket.parse::<std::net::Ipv4Addr>().is_ok() {
        result.error(FIELD, format!("Bucket name '{bucket}' looks like an IP address"));
    }
    if bucket.starts_with("xn--") || bucket.ends_with("-s3alias") {
        result.error(FIELD, format!("Bucket name '{bucket}' uses a reserved prefix or suffix"));
    }
}

fn validate_region(region: &str, result: &mut ValidationResult) {
    let well_formed = !region.is_empty()
        && region.contains('-')
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !well_formed {
        result.error("region", format!("Region '{region}' is not a valid AWS region name"));
    }
}

/// Hostname syntax: at least two labels of 1-63 letters, digits or hyphens.
fn validate_domain(domain: &str, result: &mut ValidationResult) {
    const FIELD: &str = "domain";

    if domain.len() > 253 {
        result.error(FIELD, format!("Domain '{domain}' is longer than 253 characters"));
        return;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        result.error(FIELD, format!("Domain '{domain}' must have at least two labels"));
        return;
    }

    for label in labels {
        let valid = (1..=63).contains(&label.len())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-');
        if !valid {
            result.error(
                FIELD,
                format!("Domain '{domain}' has an invalid label '{label}'"),
            );
            return;
        }
    }
}

fn validate_polling(polling: &PollingConfig, result: &mut ValidationResult) {
    for (field, config) in [
        ("polling.certificate", &polling.certificate),
        ("polling.distribution", &polling.distribution),
    ] {
        validate_poll(field, config, result);
    }
}

fn validate_poll(field: &str, config: &PollConfig, result: &mut ValidationResult) {
    if config.multiplier < 1.0 {
        result.error(field, "multiplier must be at least 1.0");
    }
    if config.initial_delay_ms > config.max_delay_ms {
        result.error(field, "initial_delay_ms must not exceed max_delay_ms");
    }
    if config.timeout_secs == 0 {
        result.error(field, "timeout_secs must be greater than zero");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployMode;

    fn config(bucket: &str) -> DeployConfig {
        DeployConfig::new(bucket, ".")
    }

    fn field_of(err: &SpaDeployError) -> Option<String> {
        match err {
            SpaDeployError::Config(ConfigError::ValidationError { field, .. }) => field.clone(),
            _ => None,
        }
    }

    #[test]
    fn test_valid_bucket_names() {
        let validator = ConfigValidator::new();
        for bucket in ["my-app", "abc", "site.example.com", "a1-b2-c3"] {
            assert!(validator.validate(&config(bucket)).is_ok(), "{bucket}");
        }
    }

    #[test]
    fn test_invalid_bucket_names() {
        let validator = ConfigValidator::new();
        for bucket in [
            "ab",
            "My-App",
            "-app",
            "app-",
            "my..app",
            "192.168.1.1",
            "xn--app",
            "under_score",
        ] {
            let err = validator.validate(&config(bucket)).expect_err(bucket);
            assert_eq!(field_of(&err).as_deref(), Some("bucket"), "{bucket}");
        }
    }

    #[test]
    fn test_domain_syntax() {
        let validator = ConfigValidator::new();
        let with_domain = |domain: &str| {
            config("my-app").with_mode(DeployMode::CustomDomain {
                domain: domain.to_string(),
            })
        };

        assert!(validator.validate(&with_domain("app.example.com")).is_ok());
        for domain in ["localhost", "-bad.example.com", "a..b.com", "sp ace.com"] {
            let err = validator.validate(&with_domain(domain)).expect_err(domain);
            assert_eq!(field_of(&err).as_deref(), Some("domain"), "{domain}");
        }
    }

    #[test]
    fn test_warns_when_bucket_region_differs_from_certificate_region() {
        let config = config("my-app")
            .with_region("eu-west-1")
            .with_mode(DeployMode::CustomDomain {
                domain: String::from("app.example.com"),
            });

        let result = ConfigValidator::new().validate(&config).expect("valid");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains(CERTIFICATE_REGION));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = config("my-app");
        config.upload_concurrency = 0;
        let err = ConfigValidator::new().validate(&config).expect_err("invalid");
        assert_eq!(field_of(&err).as_deref(), Some("upload_concurrency"));
    }

    #[test]
    fn test_identity_mismatch() {
        let state = DeploymentState::new("other-app", "us-east-1");
        let err = ConfigValidator::check_identity(&config("my-app"), &state)
            .expect_err("mismatch");
        assert!(matches!(
            err,
            SpaDeployError::Config(ConfigError::IdentityMismatch { .. })
        ));

        let state = DeploymentState::new("my-app", "eu-west-1");
        assert!(ConfigValidator::check_identity(&config("my-app"), &state).is_err());

        let state = DeploymentState::new("my-app", "us-east-1");
        assert!(ConfigValidator::check_identity(&config("my-app"), &state).is_ok());
    }

    #[test]
    fn test_match_record_follows_recorded_region() {
        let state = DeploymentState::new("my-app", "eu-west-1");

        let mut implicit = config("my-app");
        ConfigValidator::match_record(&mut implicit, Some(&state)).expect("matches");
        assert_eq!(implicit.region, "eu-west-1");

        let mut explicit = config("my-app").with_region("us-east-1");
        let err =
            ConfigValidator::match_record(&mut explicit, Some(&state)).expect_err("mismatch");
        assert!(matches!(
            err,
            SpaDeployError::Config(ConfigError::IdentityMismatch { ref field, .. })
                if field == "region"
        ));

        let mut fresh = config("my-app");
        ConfigValidator::match_record(&mut fresh, None).expect("no record");
        assert_eq!(fresh.region, "us-east-1");
    }
}
