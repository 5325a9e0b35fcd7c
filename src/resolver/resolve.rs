//! Deployment resolution.
//!
//! Turns a catalog snapshot and an operator's choices into a new
//! deployment manifest. Resolution performs no I/O: the caller scans the
//! catalog, loads any prior manifest and persists the result.

use serde::Serialize;
use tracing::debug;

use crate::error::ResolveError;

use super::catalog::ArtifactCatalog;
use super::diff::{compute_changes, LayerChange};
use super::input::{parse_layer_names, parse_layer_specs, LayerSpec};
use super::manifest::DeploymentManifest;

/// How the new manifest is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Serve the highest published version of every layer.
    AllLatest,
    /// Start from a prior deployment, then remove and override layers.
    FromPrevious {
        /// Name of the prior deployment.
        base: String,
        /// Layers to drop from the prior deployment.
        remove: Vec<String>,
        /// Layers to add or re-version, applied after removals.
        overrides: Vec<LayerSpec>,
    },
    /// Serve exactly the listed layers.
    ExplicitLayers {
        /// Requested layers; later duplicates win.
        layers: Vec<LayerSpec>,
    },
}

/// A manifest entry whose version is not in the catalog.
///
/// Informational only: the entry is kept in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyWarning {
    /// Layer name.
    pub layer: String,
    /// Version referenced by the manifest.
    pub version: u32,
    /// Highest published version of the layer, if any.
    pub latest: Option<u32>,
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The new manifest.
    pub manifest: DeploymentManifest,
    /// Differences between the prior deployment and the latest catalog.
    /// Empty unless resolving from a previous deployment.
    pub changes: Vec<LayerChange>,
    /// Entries referencing unpublished versions.
    pub warnings: Vec<ConsistencyWarning>,
    /// Fingerprint of the prior deployment, when there was one.
    pub base_fingerprint: Option<String>,
}

/// Resolver for deployment manifests.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeploymentResolver;

impl ResolutionMode {
    /// Builds a from-previous mode from comma separated operator input.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MalformedInput`] if an override item does not
    /// parse as `layer:version`.
    pub fn from_previous(
        base: impl Into<String>,
        remove: &str,
        overrides: &str,
    ) -> Result<Self, ResolveError> {
        Ok(Self::FromPrevious {
            base: base.into(),
            remove: parse_layer_names(remove),
            overrides: parse_layer_specs(overrides)?,
        })
    }

    /// Builds an explicit-layers mode from comma separated operator input.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MalformedInput`] if an item does not parse as
    /// `layer:version`.
    pub fn explicit(layers: &str) -> Result<Self, ResolveError> {
        Ok(Self::ExplicitLayers {
            layers: parse_layer_specs(layers)?,
        })
    }

    /// Name of the prior deployment this mode builds on.
    #[must_use]
    pub fn base(&self) -> Option<&str> {
        match self {
            Self::FromPrevious { base, .. } => Some(base),
            Self::AllLatest | Self::ExplicitLayers { .. } => None,
        }
    }
}

impl DeploymentResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves a new manifest.
    ///
    /// `previous` is the manifest stored under the mode's base name, or
    /// `None` if no such deployment exists. It is ignored by the modes that
    /// do not build on a prior deployment.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when resolving from a previous
    /// deployment that does not exist.
    pub fn resolve(
        &self,
        catalog: &ArtifactCatalog,
        mode: &ResolutionMode,
        previous: Option<&DeploymentManifest>,
    ) -> Result<Resolution, ResolveError> {
        let (manifest, changes, base_fingerprint) = match mode {
            ResolutionMode::AllLatest => {
                debug!("Resolving all latest layers");
                let manifest: DeploymentManifest = catalog.latest_view().into_iter().collect();
                (manifest, Vec::new(), None)
            }
            ResolutionMode::FromPrevious {
                base,
                remove,
                overrides,
            } => {
                let previous = previous.ok_or_else(|| ResolveError::not_found(base.as_str()))?;
                debug!("Resolving from previous deployment {base}");

                let changes = compute_changes(previous, &catalog.latest_view());
                let manifest = Self::apply_edits(previous, remove, overrides);
                (manifest, changes, Some(previous.fingerprint()))
            }
            ResolutionMode::ExplicitLayers { layers } => {
                debug!("Resolving {} explicit layers", layers.len());
                let manifest: DeploymentManifest = layers
                    .iter()
                    .map(|spec| (spec.layer.clone(), spec.version))
                    .collect();
                (manifest, Vec::new(), None)
            }
        };

        let warnings = Self::check_consistency(catalog, &manifest);

        Ok(Resolution {
            manifest,
            changes,
            warnings,
            base_fingerprint,
        })
    }

    /// Applies removals, then overrides, to a copy of `previous`.
    fn apply_edits(
        previous: &DeploymentManifest,
        remove: &[String],
        overrides: &[LayerSpec],
    ) -> DeploymentManifest {
        let mut manifest = previous.clone();

        for layer in remove {
            if manifest.remove(layer).is_none() {
                debug!("Layer {layer} is not in the previous deployment, nothing to remove");
            }
        }

        for spec in overrides {
            manifest.set(spec.layer.clone(), spec.version);
        }

        manifest
    }

    /// Lists manifest entries whose version was never published.
    fn check_consistency(
        catalog: &ArtifactCatalog,
        manifest: &DeploymentManifest,
    ) -> Vec<ConsistencyWarning> {
        manifest
            .artifacts()
            .filter(|a| !catalog.contains(&a.layer, a.version))
            .map(|a| ConsistencyWarning {
                latest: catalog.latest(&a.layer),
                layer: a.layer,
                version: a.version,
            })
            .collect()
    }
}

impl Resolution {
    /// Returns true if the new manifest serves exactly what its base did.
    #[must_use]
    pub fn matches_base(&self) -> bool {
        self.base_fingerprint
            .as_deref()
            .is_some_and(|fp| fp == self.manifest.fingerprint())
    }
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.latest {
            Some(latest) => write!(
                f,
                "{} v{} is not published (latest is v{latest})",
                self.layer, self.version
            ),
            None => write!(
                f,
                "{} v{} is not published (no versions of this layer exist)",
                self.layer, self.version
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::catalog::Artifact;

    fn catalog(entries: &[(&str, &[u32])]) -> ArtifactCatalog {
        entries
            .iter()
            .flat_map(|(layer, versions)| versions.iter().map(|v| Artifact::new(*layer, *v)))
            .collect()
    }

    fn manifest(entries: &[(&str, u32)]) -> DeploymentManifest {
        entries.iter().map(|(l, v)| ((*l).to_string(), *v)).collect()
    }

    #[test]
    fn test_all_latest() {
        let catalog = catalog(&[("roads", &[1, 2, 3]), ("rivers", &[1])]);
        let resolution = DeploymentResolver::new()
            .resolve(&catalog, &ResolutionMode::AllLatest, None)
            .expect("all latest never fails");

        assert_eq!(resolution.manifest, manifest(&[("roads", 3), ("rivers", 1)]));
        assert!(resolution.changes.is_empty());
        assert!(resolution.warnings.is_empty());
        assert!(!resolution.matches_base());
    }

    #[test]
    fn test_all_latest_empty_catalog() {
        let resolution = DeploymentResolver::new()
            .resolve(&ArtifactCatalog::new(), &ResolutionMode::AllLatest, None)
            .expect("empty catalog is not an error");
        assert!(resolution.manifest.is_empty());
    }

    #[test]
    fn test_from_previous_scenario() {
        let catalog = catalog(&[("roads", &[1, 2, 3]), ("rivers", &[1])]);
        let previous = manifest(&[("roads", 2), ("lakes", 1)]);
        let mode = ResolutionMode::from_previous("prod", "lakes", "rivers:1").expect("valid input");

        let resolution = DeploymentResolver::new()
            .resolve(&catalog, &mode, Some(&previous))
            .expect("previous exists");

        let changes: Vec<_> = resolution
            .changes
            .iter()
            .map(|c| (c.layer.as_str(), c.previous, c.latest))
            .collect();
        assert_eq!(changes.len(), 3);
        assert!(changes.contains(&("roads", Some(2), Some(3))));
        assert!(changes.contains(&("rivers", None, Some(1))));
        assert!(changes.contains(&("lakes", Some(1), None)));

        assert_eq!(resolution.manifest, manifest(&[("roads", 2), ("rivers", 1)]));
        assert!(resolution.warnings.is_empty());
        assert!(!resolution.matches_base());
    }

    #[test]
    fn test_from_previous_missing_base() {
        let mode = ResolutionMode::from_previous("gone", "", "").expect("valid input");
        let err = DeploymentResolver::new()
            .resolve(&ArtifactCatalog::new(), &mode, None)
            .expect_err("missing base must fail");
        assert_eq!(err, ResolveError::not_found("gone"));
    }

    #[test]
    fn test_remove_absent_layer_is_ignored() {
        let catalog = catalog(&[("roads", &[2])]);
        let previous = manifest(&[("roads", 2)]);
        let mode = ResolutionMode::from_previous("prod", "lakes", "").expect("valid input");

        let resolution = DeploymentResolver::new()
            .resolve(&catalog, &mode, Some(&previous))
            .expect("absent removal is a no-op");

        assert_eq!(resolution.manifest, previous);
        assert!(resolution.matches_base());
    }

    #[test]
    fn test_override_wins_over_removal() {
        let catalog = catalog(&[("roads", &[1, 2, 3])]);
        let previous = manifest(&[("roads", 1)]);
        let mode = ResolutionMode::from_previous("prod", "roads", "roads:3").expect("valid input");

        let resolution = DeploymentResolver::new()
            .resolve(&catalog, &mode, Some(&previous))
            .expect("resolves");

        assert_eq!(resolution.manifest.get("roads"), Some(3));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let catalog = catalog(&[("roads", &[1])]);
        let previous = manifest(&[("roads", 1), ("lakes", 1)]);
        let snapshot = previous.clone();
        let mode = ResolutionMode::from_previous("prod", "lakes", "roads:9").expect("valid input");

        let _ = DeploymentResolver::new().resolve(&catalog, &mode, Some(&previous));
        assert_eq!(previous, snapshot);
    }

    #[test]
    fn test_unpublished_versions_warn() {
        let catalog = catalog(&[("roads", &[1, 2])]);
        let mode = ResolutionMode::explicit("roads:5, coast:1").expect("valid input");

        let resolution = DeploymentResolver::new()
            .resolve(&catalog, &mode, None)
            .expect("explicit never checks the catalog");

        assert_eq!(resolution.manifest, manifest(&[("roads", 5), ("coast", 1)]));
        assert_eq!(
            resolution.warnings,
            vec![
                ConsistencyWarning { layer: "coast".into(), version: 1, latest: None },
                ConsistencyWarning { layer: "roads".into(), version: 5, latest: Some(2) },
            ]
        );
    }

    #[test]
    fn test_explicit_later_duplicates_win() {
        let mode = ResolutionMode::explicit("roads:1, roads:2").expect("valid input");
        let resolution = DeploymentResolver::new()
            .resolve(&ArtifactCatalog::new(), &mode, None)
            .expect("resolves");
        assert_eq!(resolution.manifest, manifest(&[("roads", 2)]));
    }

    #[test]
    fn test_malformed_override_rejected() {
        let err = ResolutionMode::from_previous("prod", "", "roads").expect_err("no separator");
        assert!(matches!(err, ResolveError::MalformedInput { .. }));
    }

    #[test]
    fn test_carried_over_missing_layer_warns() {
        let catalog = catalog(&[("roads", &[1])]);
        let previous = manifest(&[("roads", 1), ("lakes", 2)]);
        let mode = ResolutionMode::from_previous("prod", "", "").expect("valid input");

        let resolution = DeploymentResolver::new()
            .resolve(&catalog, &mode, Some(&previous))
            .expect("resolves");

        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(resolution.warnings[0].layer, "lakes");
    }
}
