//! Deployment resolution for vector-tile layers.
//!
//! This module holds the pure core of the tool:
//! - The artifact catalog and its latest-version view
//! - Deployment manifests and their stored JSON shape
//! - Parsing of operator layer selections
//! - Change detection against a prior deployment
//! - Resolution of a new manifest

mod catalog;
mod diff;
mod input;
mod manifest;
mod resolve;

pub use catalog::{Artifact, ArtifactCatalog, CONFIG_PREFIX, MBTILES_PREFIX};
pub use diff::{compute_changes, ChangeKind, LayerChange};
pub use input::{parse_layer_names, parse_layer_specs, validate_name, LayerSpec};
pub use manifest::{
    default_name, default_name_for, is_valid_name_format, DeploymentManifest, DEFAULT_NAME_FORMAT,
    DEPLOYMENTS_PREFIX,
};
pub use resolve::{ConsistencyWarning, DeploymentResolver, Resolution, ResolutionMode};
