//! Local directory object store.
//!
//! Mirrors the bucket key layout under a base directory. Used for offline
//! work, staging a bucket on disk, and tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, StoreError, VtilesError};

use super::object::ObjectStore;

/// Local directory object store.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    /// Directory holding the objects.
    base_dir: PathBuf,
}

impl LocalObjectStore {
    /// Creates a local store rooted at `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Gets the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Maps a key to its path on disk.
    ///
    /// Keys with `.` or `..` segments are refused so every path stays below
    /// the base directory.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.base_dir.clone();

        for part in key.split('/').filter(|part| !part.is_empty()) {
            if part == "." || part == ".." {
                return Err(local_error(
                    &self.base_dir,
                    format!("Key '{key}' has a '{part}' segment"),
                ));
            }
            path.push(part);
        }

        Ok(path)
    }

    /// Ensures the parent directory of `path` exists.
    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            debug!("Creating directory: {}", parent.display());
            fs::create_dir_all(parent)
                .await
                .map_err(|e| local_error(parent, format!("Failed to create directory: {e}")))?;
        }
        Ok(())
    }

    /// Writes `body` next to `path`, then renames it into place.
    async fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
        Self::ensure_parent(path).await?;

        let temp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| local_error(&temp_path, format!("Failed to create temp file: {e}")))?;

        file.write_all(body)
            .await
            .map_err(|e| local_error(&temp_path, format!("Failed to write file: {e}")))?;

        file.sync_all()
            .await
            .map_err(|e| local_error(&temp_path, format!("Failed to sync file: {e}")))?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| local_error(path, format!("Failed to rename file: {e}")))?;

        Ok(())
    }

    /// Recursively collects every key below the base directory.
    async fn walk(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.base_dir.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| local_error(&dir, format!("Failed to read directory: {e}")))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| local_error(&dir, format!("Failed to read directory entry: {e}")))?
            {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.base_dir) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }
}

fn local_error(path: &Path, message: String) -> VtilesError {
    VtilesError::Store(StoreError::local(path, message))
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            debug!("Store directory does not exist: {}", self.base_dir.display());
            return Ok(Vec::new());
        }

        let mut keys: Vec<String> = self
            .walk()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(prefix) && !key.ends_with(".tmp"))
            .collect();
        keys.sort();

        debug!("Found {} keys under {prefix}", keys.len());
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            debug!("Object does not exist: {}", path.display());
            return Ok(None);
        }

        let bytes = fs::read(&path)
            .await
            .map_err(|e| local_error(&path, format!("Failed to read file: {e}")))?;

        Ok(Some(bytes))
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        info!("Writing {key} to {}", path.display());
        Self::write_atomic(&path, &body).await
    }

    async fn put_file(&self, key: &str, source: &Path, _content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        info!("Copying {} to {key}", source.display());

        Self::ensure_parent(&path).await?;
        let temp_path = path.with_extension("tmp");

        fs::copy(source, &temp_path)
            .await
            .map_err(|e| local_error(source, format!("Failed to copy file: {e}")))?;

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| local_error(&path, format!("Failed to rename file: {e}")))?;

        Ok(())
    }

    async fn download_to(&self, key: &str, dest: &Path) -> Result<bool> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Ok(false);
        }

        Self::ensure_parent(dest).await?;
        fs::copy(&path, dest)
            .await
            .map_err(|e| local_error(dest, format!("Failed to copy file: {e}")))?;

        debug!("Copied {key} to {}", dest.display());
        Ok(true)
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
