//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, VtilesError};
use std::path::Path;
use tracing::{debug, info};

use super::spec::DeployConfig;

/// Configuration parser for loading deployment configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(VtilesError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            VtilesError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let config = Self::parse_yaml(&content, Some(path))?;

        // Launch templates are looked up next to the config file
        let base = self
            .base_path
            .clone()
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_default();

        Ok(DeployConfig {
            launch: config.launch.relative_to(&base),
            ..config
        })
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(content: &str, source: Option<&Path>) -> Result<DeployConfig> {
        debug!("Parsing YAML configuration");

        let config: DeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            VtilesError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed configuration for store: {}", config.storage.location());
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format:
    /// `VTILES_<SECTION>_<KEY>` (e.g., `VTILES_STORAGE_BUCKET`)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let mut config = self.load_file(path)?;

        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(config: &mut DeployConfig) {
        if let Ok(bucket) = std::env::var("VTILES_STORAGE_BUCKET") {
            debug!("Overriding storage.bucket from environment");
            config.storage.bucket = Some(bucket);
        }

        if let Ok(prefix) = std::env::var("VTILES_STORAGE_PREFIX") {
            debug!("Overriding storage.prefix from environment");
            config.storage.prefix = Some(prefix);
        }

        if let Ok(region) = std::env::var("VTILES_STORAGE_REGION") {
            debug!("Overriding storage.region from environment");
            config.storage.region = Some(region);
        }

        if let Ok(region) = std::env::var("VTILES_LAUNCH_REGION") {
            debug!("Overriding launch.region from environment");
            config.launch.region = region;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                VtilesError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["vtiles.deploy.yaml", "vtiles.deploy.yml"];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(VtilesError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
storage:
  bucket: vector-tile-server
";
        let config = ConfigParser::parse_yaml(yaml, None).expect("valid config");

        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.bucket.as_deref(), Some("vector-tile-server"));
        assert_eq!(config.deployment.name_format, "vector-tiles-%Y-%m-%d");
        assert_eq!(config.launch.region, "ap-southeast-2");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
storage:
  backend: local
  path: ./bucket

deployment:
  name_format: "staging-%Y%m%d"

launch:
  region: us-east-1
  template: templates/stack.json
  user_data: templates/user-data.sh
  capabilities:
    - CAPABILITY_IAM
    - CAPABILITY_NAMED_IAM
"#;
        let config = ConfigParser::parse_yaml(yaml, None).expect("valid config");

        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.path.as_deref(), Some("./bucket"));
        assert_eq!(config.deployment.name_format, "staging-%Y%m%d");
        assert_eq!(config.launch.capabilities.len(), 2);
    }

    #[test]
    fn test_parse_invalid_backend() {
        let yaml = "storage:\n  backend: ftp\n";
        assert!(ConfigParser::parse_yaml(yaml, None).is_err());
    }

    #[test]
    fn test_load_resolves_launch_paths() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("vtiles.deploy.yaml");
        std::fs::write(&path, "storage:\n  bucket: tiles\n").expect("write config");

        let config = ConfigParser::new().load_file(&path).expect("valid config");
        assert_eq!(config.launch.template, temp.path().join("aws-template.json"));
    }

    #[test]
    fn test_find_config_walks_up() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(temp.path().join("vtiles.deploy.yml"), "").expect("write config");

        let found = find_config_file(&nested).expect("config should be found");
        assert_eq!(found, temp.path().join("vtiles.deploy.yml"));
    }
}
