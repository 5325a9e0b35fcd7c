//! Tile repository: the bucket layout on top of an object store.
//!
//! Knows where layer artifacts, deployment manifests and server bundles
//! live, and implements scanning, manifest persistence, publishing and
//! fetching in terms of [`ObjectStore`] calls.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{PublishError, ResolveError, Result, StoreError, VtilesError};
use crate::launch::ServerVersion;
use crate::resolver::{
    validate_name, Artifact, ArtifactCatalog, DeploymentManifest, CONFIG_PREFIX, DEPLOYMENTS_PREFIX,
};

use super::object::{ObjectStore, JSON_CONTENT_TYPE, MBTILES_CONTENT_TYPE};

/// Prefix of server bundle keys at the bucket root.
const SERVER_PREFIX: &str = "server-";

/// Local files produced by the tile tooling for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSource {
    /// Layer name.
    pub layer: String,
    /// Server config JSON.
    pub config: PathBuf,
    /// Tile archive.
    pub mbtiles: PathBuf,
}

/// Result of fetching a deployment to local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Path of the written manifest.
    pub manifest_path: PathBuf,
    /// Artifacts downloaded.
    pub artifacts: Vec<Artifact>,
}

/// Repository of published tiles and deployments.
#[derive(Debug)]
pub struct TileRepository<S: ObjectStore> {
    /// Backing object store.
    store: Arc<S>,
}

impl<S: ObjectStore> Clone for TileRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl LayerSource {
    /// Locates a layer's files under a working directory.
    ///
    /// The tile tooling writes `config/<layer>.json` and
    /// `data/<layer>.mbtiles`.
    #[must_use]
    pub fn from_dir(dir: &Path, layer: &str) -> Self {
        Self {
            layer: layer.to_string(),
            config: dir.join("config").join(format!("{layer}.json")),
            mbtiles: dir.join("data").join(format!("{layer}.mbtiles")),
        }
    }

    /// Checks the layer name and that both files exist.
    fn validate(&self) -> std::result::Result<(), PublishError> {
        validate_layer_name(&self.layer)?;

        for path in [&self.config, &self.mbtiles] {
            if !path.is_file() {
                return Err(PublishError::SourceNotFound {
                    layer: self.layer.clone(),
                    path: path.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Checks that a layer name can round-trip through keys and layer specs.
fn validate_layer_name(name: &str) -> std::result::Result<(), PublishError> {
    validate_name(name).map_err(|e| PublishError::InvalidLayerName {
        name: name.to_string(),
        reason: match e {
            ResolveError::InvalidName { reason, .. } => reason,
            other => other.to_string(),
        },
    })
}

impl<S: ObjectStore + 'static> TileRepository<S> {
    /// Creates a repository over the given store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Gets the backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scans the store for published layer configs.
    ///
    /// Keys under `config/` that do not follow the
    /// `config/<layer>-v<version>.json` pattern are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub async fn scan_catalog(&self) -> Result<ArtifactCatalog> {
        let keys = self.store.list_keys(CONFIG_PREFIX).await?;

        let catalog: ArtifactCatalog = keys
            .iter()
            .filter_map(|key| {
                let artifact = Artifact::from_config_key(key);
                if artifact.is_none() {
                    warn!("Skipping unrecognised config key: {key}");
                }
                artifact
            })
            .collect();

        info!(
            "Catalog has {} layers ({} config objects)",
            catalog.layer_count(),
            keys.len()
        );
        Ok(catalog)
    }

    /// Lists deployment names, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub async fn list_deployments(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .list_keys(DEPLOYMENTS_PREFIX)
            .await?
            .iter()
            .filter_map(|key| DeploymentManifest::name_from_key(key))
            .map(String::from)
            .collect();

        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Loads a deployment manifest by name.
    ///
    /// Returns `None` if no deployment has that name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not usable as a key, the store fails
    /// or the manifest is not valid.
    pub async fn load_manifest(&self, name: &str) -> Result<Option<DeploymentManifest>> {
        validate_name(name)?;
        let key = DeploymentManifest::key_for(name);
        debug!("Loading deployment manifest {key}");

        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let manifest = serde_json::from_slice::<DeploymentManifest>(&bytes).map_err(|e| {
            VtilesError::Store(StoreError::Corrupted {
                key: key.clone(),
                message: format!("Failed to parse manifest: {e}"),
            })
        })?;

        info!("Loaded deployment {name} ({} layers)", manifest.len());
        Ok(Some(manifest))
    }

    /// Saves a deployment manifest, replacing any manifest of the same name.
    ///
    /// Returns the key written.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not usable as a key, or if
    /// serialization or the upload fails.
    pub async fn save_manifest(&self, name: &str, manifest: &DeploymentManifest) -> Result<String> {
        validate_name(name)?;
        let key = DeploymentManifest::key_for(name);

        let content = manifest.to_json().map_err(|e| {
            VtilesError::Store(StoreError::serialization(format!(
                "Failed to serialize manifest: {e}"
            )))
        })?;

        self.store
            .put(&key, content.into_bytes(), JSON_CONTENT_TYPE)
            .await?;

        info!("Saved deployment {name} ({} layers)", manifest.len());
        Ok(key)
    }

    /// Lists the server bundles available for launch, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub async fn list_server_versions(&self) -> Result<Vec<ServerVersion>> {
        let mut versions: Vec<ServerVersion> = self
            .store
            .list_keys(SERVER_PREFIX)
            .await?
            .iter()
            .filter(|key| !key.contains('/'))
            .filter_map(|key| {
                let version = ServerVersion::from_key(key);
                if version.is_none() {
                    warn!("Skipping unrecognised server bundle: {key}");
                }
                version
            })
            .collect();

        versions.sort_unstable_by(|a, b| b.cmp(a));
        Ok(versions)
    }

    /// Publishes layers under their next version numbers.
    ///
    /// Every source is checked before anything is uploaded. Uploads then run
    /// concurrently; the tile archive goes up before the config so that a
    /// layer only appears in the catalog once both objects exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is invalid, a layer is listed twice, or
    /// any upload fails.
    pub async fn publish(&self, sources: &[LayerSource]) -> Result<Vec<Artifact>> {
        let mut seen = HashSet::new();
        for source in sources {
            source.validate()?;
            if !seen.insert(source.layer.as_str()) {
                return Err(PublishError::InvalidLayerName {
                    name: source.layer.clone(),
                    reason: String::from("layer is listed more than once"),
                }
                .into());
            }
        }

        let catalog = self.scan_catalog().await?;
        let mut uploads = JoinSet::new();

        for source in sources {
            let artifact = Artifact::new(source.layer.clone(), catalog.next_version(&source.layer));
            info!("Publishing {artifact}");

            let store = Arc::clone(&self.store);
            let source = source.clone();
            uploads.spawn(async move {
                let uploaded = async {
                    store
                        .put_file(&artifact.mbtiles_key(), &source.mbtiles, MBTILES_CONTENT_TYPE)
                        .await?;
                    store
                        .put_file(&artifact.config_key(), &source.config, JSON_CONTENT_TYPE)
                        .await
                }
                .await;
                (artifact, uploaded)
            });
        }

        let total = sources.len();
        let mut published = Vec::with_capacity(total);
        let mut failed = Vec::new();

        while let Some(joined) = uploads.join_next().await {
            match joined {
                Ok((artifact, Ok(()))) => {
                    info!("Published {artifact}");
                    published.push(artifact);
                }
                Ok((artifact, Err(e))) => {
                    error!("Upload of {artifact} failed: {e}");
                    failed.push(artifact.layer);
                }
                Err(e) => {
                    error!("Upload task failed: {e}");
                    failed.push(String::from("unknown"));
                }
            }
        }

        published.sort();

        if !failed.is_empty() {
            failed.sort();
            return Err(PublishError::PartialFailure {
                failed,
                published: published.iter().map(ToString::to_string).collect(),
                total,
            }
            .into());
        }

        Ok(published)
    }

    /// Downloads a deployment and all of its artifacts to `dest`.
    ///
    /// Writes `data.json`, `config/<layer>.json` and `data/<layer>.mbtiles`,
    /// the layout the tile server reads at boot.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the deployment does not exist, a
    /// corrupted error if it names a layer that cannot be a file name, and a
    /// missing-artifact error if it references an object that is not stored.
    pub async fn fetch(&self, name: &str, dest: &Path) -> Result<FetchReport> {
        let manifest = self
            .load_manifest(name)
            .await?
            .ok_or_else(|| ResolveError::not_found(name))?;

        for layer in manifest.data.keys() {
            validate_name(layer).map_err(|e| StoreError::Corrupted {
                key: DeploymentManifest::key_for(name),
                message: e.to_string(),
            })?;
        }

        let manifest_path = dest.join("data.json");
        let content = manifest.to_json().map_err(|e| {
            VtilesError::Store(StoreError::serialization(format!(
                "Failed to serialize manifest: {e}"
            )))
        })?;
        tokio::fs::create_dir_all(dest).await?;
        tokio::fs::write(&manifest_path, content).await?;

        let mut artifacts = Vec::with_capacity(manifest.len());
        for artifact in manifest.artifacts() {
            info!("Downloading {artifact}");

            let targets = [
                (artifact.config_key(), dest.join("config").join(format!("{}.json", artifact.layer))),
                (artifact.mbtiles_key(), dest.join("data").join(format!("{}.mbtiles", artifact.layer))),
            ];

            for (key, path) in targets {
                if !self.store.download_to(&key, &path).await? {
                    return Err(StoreError::MissingArtifact { key }.into());
                }
            }

            artifacts.push(artifact);
        }

        Ok(FetchReport {
            manifest_path,
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalObjectStore, MockObjectStore};
    use tempfile::TempDir;

    fn create_test_repo() -> (TileRepository<LocalObjectStore>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalObjectStore::with_base_dir(temp_dir.path().join("bucket"));
        (TileRepository::new(store), temp_dir)
    }

    fn write_sources(dir: &Path, layer: &str) -> LayerSource {
        let source = LayerSource::from_dir(dir, layer);
        for path in [&source.config, &source.mbtiles] {
            std::fs::create_dir_all(path.parent().expect("has parent")).expect("mkdir");
            std::fs::write(path, layer.as_bytes()).expect("write source");
        }
        source
    }

    #[tokio::test]
    async fn test_manifest_round_trip() {
        let (repo, _temp) = create_test_repo();
        let manifest: DeploymentManifest =
            [("roads".to_string(), 2), ("rivers".to_string(), 1)].into_iter().collect();

        let key = repo
            .save_manifest("vector-tiles-2017-06-01", &manifest)
            .await
            .expect("Failed to save manifest");
        assert_eq!(key, "deployments/vector-tiles-2017-06-01.json");

        let loaded = repo
            .load_manifest("vector-tiles-2017-06-01")
            .await
            .expect("Failed to load manifest")
            .expect("Manifest should exist");
        assert_eq!(loaded, manifest);

        assert!(repo.load_manifest("missing").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn test_list_deployments_newest_first() {
        let (repo, _temp) = create_test_repo();
        for name in ["vector-tiles-2017-01-05", "vector-tiles-2017-03-01", "vector-tiles-2016-12-24"] {
            repo.save_manifest(name, &DeploymentManifest::new())
                .await
                .expect("Failed to save manifest");
        }

        let names = repo.list_deployments().await.expect("Failed to list");
        assert_eq!(
            names,
            vec!["vector-tiles-2017-03-01", "vector-tiles-2017-01-05", "vector-tiles-2016-12-24"]
        );
    }

    #[tokio::test]
    async fn test_publish_assigns_next_versions() {
        let (repo, temp) = create_test_repo();
        let work = temp.path().join("work");
        let roads = write_sources(&work, "roads");
        let rivers = write_sources(&work, "rivers");

        let first = repo
            .publish(&[roads.clone(), rivers])
            .await
            .expect("Failed to publish");
        assert_eq!(first, vec![Artifact::new("rivers", 1), Artifact::new("roads", 1)]);

        let second = repo.publish(&[roads]).await.expect("Failed to publish");
        assert_eq!(second, vec![Artifact::new("roads", 2)]);

        let catalog = repo.scan_catalog().await.expect("Failed to scan");
        assert_eq!(catalog.latest("roads"), Some(2));
        assert_eq!(catalog.latest("rivers"), Some(1));

        let tiles = repo
            .store()
            .get("mbtiles/roads-v2.mbtiles")
            .await
            .expect("get")
            .expect("tiles uploaded");
        assert_eq!(tiles, b"roads");
    }

    #[tokio::test]
    async fn test_publish_rejects_missing_source() {
        let (repo, temp) = create_test_repo();
        let source = LayerSource::from_dir(temp.path(), "roads");

        let err = repo.publish(&[source]).await.expect_err("sources are missing");
        assert!(matches!(err, VtilesError::Publish(PublishError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_publish_rejects_duplicates_and_bad_names() {
        let (repo, temp) = create_test_repo();
        let roads = write_sources(temp.path(), "roads");

        let err = repo
            .publish(&[roads.clone(), roads])
            .await
            .expect_err("duplicate layer");
        assert!(matches!(err, VtilesError::Publish(PublishError::InvalidLayerName { .. })));

        assert!(validate_layer_name("a,b").is_err());
        assert!(validate_layer_name("a/b").is_err());
        assert!(validate_layer_name(" a").is_err());
        assert!(validate_layer_name("..").is_err());
        assert!(validate_layer_name("SA4_2011_AUST").is_ok());
    }

    #[tokio::test]
    async fn test_partial_publish_reports_layers() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let roads = write_sources(temp.path(), "roads");
        let rivers = write_sources(temp.path(), "rivers");

        let mut store = MockObjectStore::new();
        store.expect_list_keys().returning(|_| Ok(vec![String::from("config/roads-v2.json")]));
        store.expect_put_file().returning(|key, _, _| {
            if key.contains("rivers") {
                Err(StoreError::s3("access denied").into())
            } else {
                Ok(())
            }
        });

        let err = TileRepository::new(store)
            .publish(&[roads, rivers])
            .await
            .expect_err("rivers upload fails");

        match err {
            VtilesError::Publish(PublishError::PartialFailure {
                failed,
                published,
                total,
            }) => {
                assert_eq!(failed, vec!["rivers"]);
                assert_eq!(published, vec!["roads-v3"]);
                assert_eq!(total, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_writes_server_layout() {
        let (repo, temp) = create_test_repo();
        let roads = write_sources(&temp.path().join("work"), "roads");
        repo.publish(&[roads]).await.expect("Failed to publish");

        let manifest: DeploymentManifest = [("roads".to_string(), 1)].into_iter().collect();
        repo.save_manifest("prod", &manifest).await.expect("Failed to save");

        let dest = temp.path().join("etc");
        let report = repo.fetch("prod", &dest).await.expect("Failed to fetch");

        assert_eq!(report.artifacts, vec![Artifact::new("roads", 1)]);
        assert!(dest.join("config/roads.json").is_file());
        assert!(dest.join("data/roads.mbtiles").is_file());

        let written = std::fs::read_to_string(&report.manifest_path).expect("read data.json");
        assert_eq!(DeploymentManifest::from_json(&written).expect("parse"), manifest);
    }

    #[tokio::test]
    async fn test_fetch_errors() {
        let (repo, temp) = create_test_repo();

        let err = repo.fetch("nope", temp.path()).await.expect_err("no deployment");
        assert!(err.is_not_found());

        let manifest: DeploymentManifest = [("ghost".to_string(), 4)].into_iter().collect();
        repo.save_manifest("broken", &manifest).await.expect("Failed to save");
        let err = repo.fetch("broken", temp.path()).await.expect_err("missing artifact");
        assert!(matches!(err, VtilesError::Store(StoreError::MissingArtifact { .. })));
    }

    #[tokio::test]
    async fn test_fetch_refuses_layers_outside_dest() {
        let (repo, temp) = create_test_repo();
        repo.store()
            .put(
                "deployments/evil.json",
                br#"{"data": {"../../escaped": 1}}"#.to_vec(),
                JSON_CONTENT_TYPE,
            )
            .await
            .expect("Failed to put manifest");

        let dest = temp.path().join("out/etc");
        let err = repo.fetch("evil", &dest).await.expect_err("layer escapes dest");
        assert!(matches!(err, VtilesError::Store(StoreError::Corrupted { .. })));
        assert!(!temp.path().join("escaped.json").exists());
        assert!(!dest.join("data.json").exists());
    }

    #[tokio::test]
    async fn test_manifest_names_must_be_plain() {
        let (repo, _temp) = create_test_repo();

        let err = repo
            .save_manifest("../x", &DeploymentManifest::new())
            .await
            .expect_err("name escapes deployments/");
        assert!(matches!(err, VtilesError::Resolve(ResolveError::InvalidName { .. })));

        assert!(repo.load_manifest("a/b").await.is_err());
    }

    #[tokio::test]
    async fn test_scan_skips_unrecognised_keys() {
        let mut store = MockObjectStore::new();
        store.expect_list_keys().returning(|_| {
            Ok(vec![
                String::from("config/roads-v1.json"),
                String::from("config/roads-v3.json"),
                String::from("config/notes.txt"),
                String::from("config/lakes-v.json"),
            ])
        });

        let catalog = TileRepository::new(store).scan_catalog().await.expect("scan");
        assert_eq!(catalog.layer_count(), 1);
        assert_eq!(catalog.latest("roads"), Some(3));
    }

    #[tokio::test]
    async fn test_load_corrupted_manifest() {
        let mut store = MockObjectStore::new();
        store
            .expect_get()
            .withf(|key| key.ends_with("deployments/prod.json"))
            .returning(|_| Ok(Some(b"{\"layers\": []}".to_vec())));

        let err = TileRepository::new(store)
            .load_manifest("prod")
            .await
            .expect_err("wrong shape");
        assert!(matches!(err, VtilesError::Store(StoreError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_server_versions_sorted() {
        let mut store = MockObjectStore::new();
        store.expect_list_keys().returning(|_| {
            Ok(vec![
                String::from("server-1.9.2.tar.gz"),
                String::from("server-1.10.0.tar.gz"),
                String::from("server-beta.tar.gz"),
                String::from("server-old/1.0.0.tar.gz"),
            ])
        });

        let versions = TileRepository::new(store)
            .list_server_versions()
            .await
            .expect("list");
        let names: Vec<String> = versions.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["1.10.0", "1.9.2"]);
    }
}
