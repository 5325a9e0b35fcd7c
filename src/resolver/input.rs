//! Parsing of operator-supplied layer selections.
//!
//! Selections arrive as comma separated `layer_name:version` items, and
//! removals as comma separated layer names.

use std::str::FromStr;

use crate::error::ResolveError;

/// A `(layer, version)` pair requested by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    /// Layer name.
    pub layer: String,
    /// Requested version.
    pub version: u32,
}

impl LayerSpec {
    /// Creates a new layer spec.
    #[must_use]
    pub fn new(layer: impl Into<String>, version: u32) -> Self {
        Self {
            layer: layer.into(),
            version,
        }
    }
}

impl FromStr for LayerSpec {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (layer, version) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| ResolveError::malformed(trimmed, "expected layer_name:version"))?;

        let layer = layer.trim();
        if let Some(problem) = name_problem(layer) {
            return Err(ResolveError::malformed(trimmed, format!("layer {problem}")));
        }

        let version = version.trim().parse::<u32>().map_err(|e| {
            ResolveError::malformed(trimmed, format!("version is not a non-negative integer: {e}"))
        })?;

        Ok(Self::new(layer, version))
    }
}

impl std::fmt::Display for LayerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.layer, self.version)
    }
}

/// Describes why `name` cannot be a layer or deployment name.
///
/// Names become single key segments and single file names, so they must
/// not be empty, padded, dot segments, or contain separators.
fn name_problem(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some(String::from("name is empty"));
    }
    if name.trim() != name {
        return Some(String::from("name has leading or trailing whitespace"));
    }
    if name == "." || name == ".." {
        return Some(format!("name cannot be '{name}'"));
    }
    name.chars()
        .find(|c| matches!(c, '/' | ',' | '\\' | ':'))
        .map(|c| format!("name contains '{c}'"))
}

/// Checks that a layer or deployment name is safe to use in object keys
/// and local paths.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidName`] describing the first problem.
pub fn validate_name(name: &str) -> Result<(), ResolveError> {
    name_problem(name).map_or(Ok(()), |problem| Err(ResolveError::invalid_name(name, problem)))
}

/// Splits a comma separated list, trimming items and dropping empty ones.
fn split_list(input: &str) -> impl Iterator<Item = &str> {
    input.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Parses a comma separated list of `layer:version` items.
///
/// # Errors
///
/// Returns [`ResolveError::MalformedInput`] for the first item that does
/// not parse.
pub fn parse_layer_specs(input: &str) -> Result<Vec<LayerSpec>, ResolveError> {
    split_list(input).map(str::parse).collect()
}

/// Parses a comma separated list of layer names.
#[must_use]
pub fn parse_layer_names(input: &str) -> Vec<String> {
    split_list(input).map(String::from).collect()
}
