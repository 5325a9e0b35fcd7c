//! Configuration types for the deployment tool.
//!
//! This module defines the structs that map to the `vtiles.deploy.yaml`
//! file: where artifacts are stored, how deployments are named, and how a
//! stack serving a deployment is launched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::resolver::DEFAULT_NAME_FORMAT;

/// Default AWS region for launched stacks.
pub const DEFAULT_LAUNCH_REGION: &str = "ap-southeast-2";

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployConfig {
    /// Artifact storage configuration.
    pub storage: StorageConfig,
    /// Deployment naming.
    #[serde(default)]
    pub deployment: DeploymentConfig,
    /// Stack launch settings.
    #[serde(default)]
    pub launch: LaunchConfig,
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Backend type (s3 or local).
    #[serde(default)]
    pub backend: StorageBackend,
    /// S3 bucket name (required for s3 backend).
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 key prefix (optional).
    #[serde(default)]
    pub prefix: Option<String>,
    /// S3 region (optional, uses AWS default if not specified).
    #[serde(default)]
    pub region: Option<String>,
    /// Directory mirroring the bucket (required for local backend).
    #[serde(default)]
    pub path: Option<String>,
}

/// Storage backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// AWS S3 bucket.
    #[default]
    S3,
    /// Local directory with the bucket layout.
    Local,
}

/// Deployment naming configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentConfig {
    /// `strftime` format of the default deployment name.
    #[serde(default = "default_name_format")]
    pub name_format: String,
}

/// Stack launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchConfig {
    /// AWS region to create stacks in.
    #[serde(default = "default_launch_region")]
    pub region: String,
    /// `CloudFormation` template with a user-data placeholder.
    #[serde(default = "default_template")]
    pub template: PathBuf,
    /// Instance user-data script with stack name and server version
    /// placeholders.
    #[serde(default = "default_user_data")]
    pub user_data: PathBuf,
    /// Capabilities acknowledged when creating the stack.
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
}

fn default_name_format() -> String {
    String::from(DEFAULT_NAME_FORMAT)
}

fn default_launch_region() -> String {
    String::from(DEFAULT_LAUNCH_REGION)
}

fn default_template() -> PathBuf {
    PathBuf::from("aws-template.json")
}

fn default_user_data() -> PathBuf {
    PathBuf::from("user-data")
}

fn default_capabilities() -> Vec<String> {
    vec![String::from("CAPABILITY_IAM")]
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            name_format: default_name_format(),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            region: default_launch_region(),
            template: default_template(),
            user_data: default_user_data(),
            capabilities: default_capabilities(),
        }
    }
}

impl LaunchConfig {
    /// Resolves relative template paths against `base`.
    #[must_use]
    pub fn relative_to(mut self, base: &Path) -> Self {
        if self.template.is_relative() {
            self.template = base.join(&self.template);
        }
        if self.user_data.is_relative() {
            self.user_data = base.join(&self.user_data);
        }
        self
    }
}

impl StorageConfig {
    /// Human readable location of the store.
    #[must_use]
    pub fn location(&self) -> String {
        match self.backend {
            StorageBackend::S3 => {
                let bucket = self.bucket.as_deref().unwrap_or("<unset>");
                match self.prefix.as_deref() {
                    Some(prefix) if !prefix.is_empty() => format!("s3://{bucket}/{prefix}"),
                    _ => format!("s3://{bucket}"),
                }
            }
            StorageBackend::Local => self.path.as_deref().unwrap_or("<unset>").to_string(),
        }
    }
}
