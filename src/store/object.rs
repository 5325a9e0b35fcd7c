//! Object store trait definition.
//!
//! This module defines the common interface for artifact storage backends.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Trait for object storage backends.
///
/// Keys are `/` separated paths such as `config/roads-v3.json`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every key starting with `prefix`, in ascending order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Reads an object.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes an object, replacing any existing one.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Uploads a local file as an object.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()>;

    /// Downloads an object to a local file.
    ///
    /// Returns `false` if the key does not exist.
    async fn download_to(&self, key: &str, path: &Path) -> Result<bool>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl ObjectStore for Box<dyn ObjectStore> {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list_keys(prefix).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        (**self).put(key, body, content_type).await
    }

    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        (**self).put_file(key, path, content_type).await
    }

    async fn download_to(&self, key: &str, path: &Path) -> Result<bool> {
        (**self).download_to(key, path).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}

/// Content type for JSON objects.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type for mbtiles archives.
pub const MBTILES_CONTENT_TYPE: &str = "application/x-sqlite3";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalObjectStore;
    use tempfile::TempDir;

    #[test]
    fn test_boxed_store_delegates() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store: Box<dyn ObjectStore> =
            Box::new(LocalObjectStore::with_base_dir(temp.path()));

        assert_eq!(store.backend_type(), "local");

        tokio_test::block_on(async {
            store
                .put("deployments/prod.json", b"{}".to_vec(), JSON_CONTENT_TYPE)
                .await
                .expect("put succeeds");

            let keys = store.list_keys("deployments/").await.expect("list succeeds");
            assert_eq!(keys, vec![String::from("deployments/prod.json")]);
            assert_eq!(
                store.get("deployments/prod.json").await.expect("get succeeds"),
                Some(b"{}".to_vec())
            );
            assert_eq!(store.get("deployments/missing.json").await.expect("get succeeds"), None);
        });
    }
}
