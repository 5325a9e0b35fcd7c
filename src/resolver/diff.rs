//! Differences between a prior deployment and the latest published layers.

use std::collections::{BTreeMap, BTreeSet};
use serde::Serialize;
use tracing::debug;

use super::manifest::DeploymentManifest;

/// A layer whose version differs between a prior deployment and the
/// latest published catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerChange {
    /// Layer name.
    pub layer: String,
    /// Version in the prior deployment, `None` if it did not serve the layer.
    pub previous: Option<u32>,
    /// Latest published version, `None` if the catalog no longer has it.
    pub latest: Option<u32>,
}

/// Kind of change a layer went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Published, but not in the prior deployment.
    New,
    /// In the prior deployment, but no longer published.
    Missing,
    /// In both, with different versions.
    Changed,
}

impl LayerChange {
    /// Classifies the change.
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match (self.previous, self.latest) {
            (None, _) => ChangeKind::New,
            (_, None) => ChangeKind::Missing,
            (Some(_), Some(_)) => ChangeKind::Changed,
        }
    }
}

/// Computes the layers whose versions differ between `previous` and the
/// latest-version view.
///
/// Layers appearing on only one side are reported with `None` on the other.
/// Identical versions never appear. The result is sorted by layer name.
#[must_use]
pub fn compute_changes(
    previous: &DeploymentManifest,
    latest: &BTreeMap<String, u32>,
) -> Vec<LayerChange> {
    let layers: BTreeSet<&String> = previous.data.keys().chain(latest.keys()).collect();

    let changes: Vec<LayerChange> = layers
        .into_iter()
        .filter_map(|layer| {
            let old = previous.data.get(layer).copied();
            let new = latest.get(layer).copied();
            (old != new).then(|| LayerChange {
                layer: layer.clone(),
                previous: old,
                latest: new,
            })
        })
        .collect();

    debug!("{} layers differ from the latest catalog", changes.len());
    changes
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Missing => "missing",
            Self::Changed => "changed",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for LayerChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: Option<u32>| v.map_or_else(|| String::from("-"), |v| format!("v{v}"));
        write!(
            f,
            "{}: {} -> {} ({})",
            self.layer,
            show(self.previous),
            show(self.latest),
            self.kind()
        )
    }
}
