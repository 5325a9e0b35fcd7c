//! Deployment manifest type.
//!
//! A manifest maps each served layer to exactly one version. Its JSON form
//! is `{"data": {"<layer>": <version>, ...}}` and is read by the tile server
//! at boot, so the shape must not change.

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write;

use super::catalog::Artifact;
use super::input::validate_name;
use crate::error::{ConfigError, Result};

/// Key prefix under which deployment manifests are stored.
pub const DEPLOYMENTS_PREFIX: &str = "deployments/";

/// Default `strftime` format for deployment names.
pub const DEFAULT_NAME_FORMAT: &str = "vector-tiles-%Y-%m-%d";

/// Named snapshot of layer versions served by one deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    /// Layer name to chosen version.
    pub data: BTreeMap<String, u32>,
}

impl DeploymentManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Number of layers in the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the manifest serves no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Version chosen for a layer.
    #[must_use]
    pub fn get(&self, layer: &str) -> Option<u32> {
        self.data.get(layer).copied()
    }

    /// Inserts or overwrites a layer version.
    pub fn set(&mut self, layer: impl Into<String>, version: u32) -> Option<u32> {
        self.data.insert(layer.into(), version)
    }

    /// Removes a layer, returning its previous version.
    pub fn remove(&mut self, layer: &str) -> Option<u32> {
        self.data.remove(layer)
    }

    /// Iterates the manifest as artifacts, in layer name order.
    pub fn artifacts(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.data
            .iter()
            .map(|(layer, version)| Artifact::new(layer.clone(), *version))
    }

    /// Parses a manifest from its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not have the manifest shape.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Renders the manifest in its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Computes a stable fingerprint of the layer selection.
    ///
    /// Two manifests have the same fingerprint exactly when they serve the
    /// same versions of the same layers.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        for (layer, version) in &self.data {
            hasher.update(layer.as_bytes());
            hasher.update([0]);
            hasher.update(version.to_be_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Object key for a deployment of the given name.
    #[must_use]
    pub fn key_for(name: &str) -> String {
        format!("{DEPLOYMENTS_PREFIX}{name}.json")
    }

    /// Extracts the deployment name from a `deployments/<name>.json` key.
    #[must_use]
    pub fn name_from_key(key: &str) -> Option<&str> {
        key.strip_prefix(DEPLOYMENTS_PREFIX)?
            .strip_suffix(".json")
            .filter(|name| !name.is_empty())
    }
}

impl FromIterator<(String, u32)> for DeploymentManifest {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

/// Returns true if every `strftime` item in `format` is recognised.
#[must_use]
pub fn is_valid_name_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Default deployment name for the given date.
///
/// # Errors
///
/// Returns a configuration error if `format` is not a usable `strftime`
/// format for a date, or the formatted name is not a valid deployment name.
pub fn default_name_for(date: NaiveDate, format: &str) -> Result<String> {
    let invalid = || {
        ConfigError::validation(
            format!("Invalid deployment name format '{format}'"),
            "deployment.name_format",
        )
    };

    if !is_valid_name_format(format) {
        return Err(invalid().into());
    }

    let mut name = String::new();
    write!(name, "{}", date.format(format)).map_err(|_| invalid())?;

    validate_name(&name).map_err(|e| {
        ConfigError::validation(e.to_string(), "deployment.name_format")
    })?;

    Ok(name)
}

/// Default deployment name for today.
///
/// # Errors
///
/// See [`default_name_for`].
pub fn default_name(format: &str) -> Result<String> {
    default_name_for(Local::now().date_naive(), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeploymentManifest {
        [("roads".to_string(), 2), ("rivers".to_string(), 1)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json, serde_json::json!({"data": {"roads": 2, "rivers": 1}}));
    }

    #[test]
    fn test_json_round_trip() {
        let manifest = sample();
        let json = manifest.to_json().expect("serialize");
        let loaded = DeploymentManifest::from_json(&json).expect("parse");
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_rejects_wrong_shape() {
        assert!(DeploymentManifest::from_json(r#"{"roads": 1}"#).is_err());
        assert!(DeploymentManifest::from_json(r#"{"data": {"roads": "1"}}"#).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_selection() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.set("roads", 3);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_name_keys() {
        assert_eq!(
            DeploymentManifest::key_for("vector-tiles-2017-06-01"),
            "deployments/vector-tiles-2017-06-01.json"
        );
        assert_eq!(
            DeploymentManifest::name_from_key("deployments/prod.json"),
            Some("prod")
        );
        assert_eq!(DeploymentManifest::name_from_key("deployments/.json"), None);
        assert_eq!(DeploymentManifest::name_from_key("config/prod.json"), None);
    }

    #[test]
    fn test_default_name() {
        let date = NaiveDate::from_ymd_opt(2017, 6, 1).expect("valid date");
        assert_eq!(
            default_name_for(date, DEFAULT_NAME_FORMAT).expect("valid format"),
            "vector-tiles-2017-06-01"
        );
    }

    #[test]
    fn test_bad_name_format_is_an_error() {
        let date = NaiveDate::from_ymd_opt(2017, 6, 1).expect("valid date");

        assert!(!is_valid_name_format("tiles-%Q"));
        let err = default_name_for(date, "tiles-%Q").expect_err("unknown item");
        assert!(err.to_string().contains("tiles-%Q"));

        // Time fields have nothing to format from a bare date.
        assert!(default_name_for(date, "tiles-%H").is_err());
        assert!(default_name_for(date, "../%Y").is_err());
    }
}
