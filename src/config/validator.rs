//! Configuration validation.
//!
//! Checks the loaded configuration before any store or AWS client is
//! created, collecting every error and non-fatal warning.

use crate::error::{ConfigError, Result, VtilesError};
use crate::resolver::{default_name_for, is_valid_name_format};
use chrono::NaiveDate;
use tracing::debug;

use super::spec::{DeployConfig, DeploymentConfig, LaunchConfig, StorageBackend, StorageConfig};

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

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
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a deployment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_storage(&config.storage, &mut result);
        Self::validate_deployment(&config.deployment, &mut result);
        Self::validate_launch(&config.launch, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(VtilesError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    /// Validates storage configuration.
    fn validate_storage(storage: &StorageConfig, result: &mut ValidationResult) {
        match storage.backend {
            StorageBackend::S3 => match storage.bucket.as_deref() {
                None | Some("") => result.errors.push(ValidationError {
                    field: String::from("storage.bucket"),
                    message: String::from("S3 bucket name is required when using S3 backend"),
                }),
                Some(bucket) if !is_valid_bucket_name(bucket) => {
                    result.errors.push(ValidationError {
                        field: String::from("storage.bucket"),
                        message: format!(
                            "Bucket name '{bucket}' is invalid. Must be 3-63 lowercase letters, digits, dots or hyphens."
                        ),
                    });
                }
                Some(_) => {}
            },
            StorageBackend::Local => {
                if storage.path.as_deref().is_none_or(str::is_empty) {
                    result.errors.push(ValidationError {
                        field: String::from("storage.path"),
                        message: String::from("A directory is required when using the local backend"),
                    });
                }
                if storage.bucket.is_some() {
                    result
                        .warnings
                        .push(String::from("storage.bucket is ignored by the local backend"));
                }
            }
        }
    }

    /// Validates deployment naming.
    fn validate_deployment(deployment: &DeploymentConfig, result: &mut ValidationResult) {
        let format = &deployment.name_format;

        if format.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("deployment.name_format"),
                message: String::from("Deployment name format cannot be empty"),
            });
            return;
        }

        if !is_valid_name_format(format) {
            result.errors.push(ValidationError {
                field: String::from("deployment.name_format"),
                message: format!("'{format}' contains an unknown strftime item"),
            });
            return;
        }

        let sample = NaiveDate::default();
        if let Err(e) = default_name_for(sample, format) {
            result.errors.push(ValidationError {
                field: String::from("deployment.name_format"),
                message: format!("'{format}' does not produce a valid deployment name ({e})"),
            });
        }

        if !format.contains('%') {
            result.warnings.push(String::from(
                "deployment.name_format has no date fields; every default name will be the same",
            ));
        }
    }

    /// Validates launch settings.
    fn validate_launch(launch: &LaunchConfig, result: &mut ValidationResult) {
        if launch.region.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("launch.region"),
                message: String::from("Launch region cannot be empty"),
            });
        }

        for (i, capability) in launch.capabilities.iter().enumerate() {
            if !capability.starts_with("CAPABILITY_") {
                result.warnings.push(format!(
                    "launch.capabilities[{i}]: Unknown capability '{capability}'"
                ));
            }
        }
    }
}

/// Checks a name against the S3 bucket naming rules.
fn is_valid_bucket_name(name: &str) -> bool {
    if !(3..=63).contains(&name.len()) {
        return false;
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');

    let valid_ends = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    valid_chars && valid_ends && !name.contains("..")
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn parse(yaml: &str) -> DeployConfig {
        ConfigParser::parse_yaml(yaml, None).expect("valid yaml")
    }

    #[test]
    fn test_valid_bucket_name() {
        assert!(is_valid_bucket_name("vector-tile-server"));
        assert!(is_valid_bucket_name("tiles.example.com"));
        assert!(!is_valid_bucket_name("ab"));
        assert!(!is_valid_bucket_name("Vector-Tiles"));
        assert!(!is_valid_bucket_name("-tiles"));
        assert!(!is_valid_bucket_name("tiles..prod"));
    }

    #[test]
    fn test_s3_requires_bucket() {
        let config = parse("storage:\n  backend: s3\n");
        let err = ConfigValidator::new().validate(&config).expect_err("bucket missing");
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn test_local_requires_path() {
        let config = parse("storage:\n  backend: local\n");
        assert!(ConfigValidator::new().validate(&config).is_err());

        let config = parse("storage:\n  backend: local\n  path: ./bucket\n");
        let result = ConfigValidator::new().validate(&config).expect("valid");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let config = parse(
            "storage:\n  bucket: vector-tile-server\ndeployment:\n  name_format: prod\nlaunch:\n  capabilities: [IAM]\n",
        );
        let result = ConfigValidator::new().validate(&config).expect("only warnings");
        assert_eq!(result.warning_count(), 2);
    }

    #[test]
    fn test_name_format_cannot_nest_keys() {
        let config = parse("storage:\n  bucket: vector-tile-server\ndeployment:\n  name_format: a/%Y\n");
        assert!(ConfigValidator::new().validate(&config).is_err());

        let config = parse("storage:\n  bucket: vector-tile-server\ndeployment:\n  name_format: \"..\"\n");
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_invalid_strftime_rejected() {
        let config = parse("storage:\n  bucket: vector-tile-server\ndeployment:\n  name_format: tiles-%Q\n");
        let err = ConfigValidator::new().validate(&config).expect_err("unknown item");
        assert!(err.to_string().contains("strftime"));

        let config = parse("storage:\n  bucket: vector-tile-server\ndeployment:\n  name_format: tiles-%H\n");
        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
