//! Error types for the vtiles deployment tool.
//!
//! This module provides the error hierarchy for every stage of the
//! publishing pipeline: configuration, object storage, deployment
//! resolution, layer publishing, and stack launch.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the vtiles deployment tool.
#[derive(Debug, Error)]
pub enum VtilesError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Object store errors.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Deployment resolution errors.
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Layer publishing errors.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Stack launch errors.
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Object store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An S3 request failed.
    #[error("S3 error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },

    /// A local store operation failed.
    #[error("Local store error at {path}: {message}")]
    LocalError {
        /// Path involved in the failure.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A stored object could not be decoded.
    #[error("Object {key} is corrupted: {message}")]
    Corrupted {
        /// Key of the corrupted object.
        key: String,
        /// Description of the corruption.
        message: String,
    },

    /// Serialization error.
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// An artifact referenced by a deployment is missing from the store.
    #[error("Artifact {key} referenced by the deployment is missing")]
    MissingArtifact {
        /// Key of the missing object.
        key: String,
    },
}

/// Deployment resolution errors.
///
/// Both variants abort a resolution; no partial manifest is produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The named prior deployment manifest does not exist.
    #[error("Deployment '{name}' not found")]
    NotFound {
        /// Name of the missing deployment.
        name: String,
    },

    /// A layer specification could not be parsed into `(name, version)`.
    #[error("Malformed layer specification '{input}': {reason}")]
    MalformedInput {
        /// The offending input text.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A layer or deployment name cannot be used in an object key or path.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Layer publishing errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The layer name cannot be used in an object key.
    #[error("Invalid layer name '{name}': {reason}")]
    InvalidLayerName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A source file produced by the tile tooling is missing.
    #[error("Source file for layer '{layer}' not found: {path}")]
    SourceNotFound {
        /// Layer being published.
        layer: String,
        /// Expected path.
        path: PathBuf,
    },

    /// One or more layers failed to upload.
    #[error(
        "Publishing failed for {} of {total} layers ({}); published: {}",
        .failed.len(),
        .failed.join(", "),
        list_or_none(.published)
    )]
    PartialFailure {
        /// Layers whose upload failed.
        failed: Vec<String>,
        /// Artifacts that were fully uploaded, as `layer-v<n>`.
        published: Vec<String>,
        /// Number of layers attempted.
        total: usize,
    },
}

/// Stack launch errors.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No server bundle is available to launch.
    #[error("No server versions found in the store")]
    NoServerVersions,

    /// The requested server bundle does not exist.
    #[error("Server version {version} not found (available: {available})")]
    UnknownServerVersion {
        /// The requested version.
        version: String,
        /// Comma separated list of available versions.
        available: String,
    },

    /// A template file could not be read.
    #[error("Failed to read template {path}: {message}")]
    TemplateUnreadable {
        /// Path of the template.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// `CloudFormation` rejected the stack.
    #[error("CloudFormation error: {message}")]
    CloudFormation {
        /// Description of the failure.
        message: String,
    },
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        String::from("none")
    } else {
        items.join(", ")
    }
}

/// Result type alias for vtiles operations.
pub type Result<T> = std::result::Result<T, VtilesError>;

impl VtilesError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::S3Error { .. }) | Self::Launch(LaunchError::CloudFormation { .. })
        )
    }

    /// Returns true if this error means a named deployment does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Resolve(ResolveError::NotFound { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl StoreError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }

    /// Creates a local store error for the given path.
    #[must_use]
    pub fn local(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::LocalError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl ResolveError {
    /// Creates a not-found error for the named deployment.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an invalid-name error.
    #[must_use]
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed-input error.
    #[must_use]
    pub fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
