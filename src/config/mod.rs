//! Configuration module for the vtiles deployment tool.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `vtiles.deploy.yaml`
//! - Environment variable overrides and `.env` loading
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{find_config_file, ConfigParser, DEFAULT_CONFIG_FILES};
pub use spec::{
    DeployConfig, DeploymentConfig, LaunchConfig, StorageBackend, StorageConfig,
    DEFAULT_LAUNCH_REGION,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
