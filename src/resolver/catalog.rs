//! Artifact catalog types.
//!
//! The catalog is the inventory of every published `(layer, version)` pair,
//! derived from the `config/` keys of the object store.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Key prefix under which layer configs are published.
pub const CONFIG_PREFIX: &str = "config/";

/// Key prefix under which tile archives are published.
pub const MBTILES_PREFIX: &str = "mbtiles/";

/// Marker between layer name and version in artifact keys.
const VERSION_MARKER: &str = "-v";

/// One published version of a layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Artifact {
    /// Layer name.
    pub layer: String,
    /// Version number assigned at publish time.
    pub version: u32,
}

/// Every published version of every layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCatalog {
    layers: BTreeMap<String, BTreeSet<u32>>,
}

impl Artifact {
    /// Creates a new artifact.
    #[must_use]
    pub fn new(layer: impl Into<String>, version: u32) -> Self {
        Self {
            layer: layer.into(),
            version,
        }
    }

    /// Parses an artifact from a `config/<layer>-v<version>.json` key.
    ///
    /// The layer name is everything up to the last `-v`, so names that
    /// themselves contain `-v` still parse. Returns `None` for keys that do
    /// not follow the pattern.
    #[must_use]
    pub fn from_config_key(key: &str) -> Option<Self> {
        let stem = key.strip_prefix(CONFIG_PREFIX)?.strip_suffix(".json")?;
        let (layer, version) = stem.rsplit_once(VERSION_MARKER)?;

        if layer.is_empty() || version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let version = version.parse().ok()?;
        Some(Self::new(layer, version))
    }

    /// Object key of this artifact's server config.
    #[must_use]
    pub fn config_key(&self) -> String {
        format!("{CONFIG_PREFIX}{}{VERSION_MARKER}{}.json", self.layer, self.version)
    }

    /// Object key of this artifact's tile archive.
    #[must_use]
    pub fn mbtiles_key(&self) -> String {
        format!("{MBTILES_PREFIX}{}{VERSION_MARKER}{}.mbtiles", self.layer, self.version)
    }
}

impl ArtifactCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            layers: BTreeMap::new(),
        }
    }

    /// Records a published artifact.
    pub fn insert(&mut self, artifact: Artifact) {
        self.layers
            .entry(artifact.layer)
            .or_default()
            .insert(artifact.version);
    }

    /// Returns true if no artifacts are published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of distinct layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// All versions of a layer, ascending.
    #[must_use]
    pub fn versions(&self, layer: &str) -> Option<&BTreeSet<u32>> {
        self.layers.get(layer)
    }

    /// Highest published version of a layer.
    #[must_use]
    pub fn latest(&self, layer: &str) -> Option<u32> {
        self.layers.get(layer).and_then(|v| v.last().copied())
    }

    /// Returns true if the exact `(layer, version)` pair was published.
    #[must_use]
    pub fn contains(&self, layer: &str, version: u32) -> bool {
        self.layers
            .get(layer)
            .is_some_and(|versions| versions.contains(&version))
    }

    /// Iterates layers and their versions in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<u32>)> {
        self.layers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Layer name to highest version, recomputed on every call.
    #[must_use]
    pub fn latest_view(&self) -> BTreeMap<String, u32> {
        self.layers
            .iter()
            .filter_map(|(layer, versions)| versions.last().map(|v| (layer.clone(), *v)))
            .collect()
    }

    /// The version the next publish of `layer` should receive.
    #[must_use]
    pub fn next_version(&self, layer: &str) -> u32 {
        self.latest(layer).unwrap_or(0).saturating_add(1)
    }
}

impl FromIterator<Artifact> for ArtifactCatalog {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for artifact in iter {
            catalog.insert(artifact);
        }
        catalog
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{VERSION_MARKER}{}", self.layer, self.version)
    }
}
