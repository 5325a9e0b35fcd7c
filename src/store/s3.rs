//! S3 object store backend.
//!
//! This is the production store: published layers, deployment manifests and
//! server bundles all live in one bucket, optionally under a key prefix.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, StoreError, VtilesError};

use super::object::ObjectStore;

/// Metadata key recording which machine uploaded an object.
const UPLOADED_BY: &str = "uploaded-by";

/// S3-based object store.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix.
    prefix: String,
}

/// Normalises a key prefix to either empty or `path/`.
fn normalize_prefix(prefix: Option<&str>) -> String {
    prefix
        .map(|p| {
            let p = p.trim_matches('/');
            if p.is_empty() {
                String::new()
            } else {
                format!("{p}/")
            }
        })
        .unwrap_or_default()
}

/// Name of this machine, for upload metadata.
fn uploader() -> String {
    hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string())
}

fn s3_error(message: String) -> VtilesError {
    VtilesError::Store(StoreError::s3(message))
}

impl S3ObjectStore {
    /// Creates a new S3 object store.
    ///
    /// # Errors
    ///
    /// Returns an error if the S3 client cannot be initialized.
    pub async fn new(bucket: &str, prefix: Option<&str>, region: Option<&str>) -> Result<Self> {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Ok(Self::with_client(Client::new(&config), bucket, prefix))
    }

    /// Creates a new S3 object store with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, prefix: Option<&str>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
        }
    }

    /// Gets the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Gets the full S3 key for an object key.
    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Sends a `GetObject`, mapping a missing key to `None`.
    async fn get_object(
        &self,
        key: &str,
    ) -> Result<Option<aws_sdk_s3::operation::get_object::GetObjectOutput>> {
        let full_key = self.full_key(key);
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await;

        match result {
            Ok(response) => Ok(Some(response)),
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_no_such_key() {
                    debug!("No object at s3://{}/{full_key}", self.bucket);
                    Ok(None)
                } else {
                    Err(s3_error(format!("S3 get error for {full_key}: {service_err}")))
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let full_prefix = self.full_key(prefix);
        debug!("Listing s3://{}/{full_prefix}", self.bucket);

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&full_prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| s3_error(format!("S3 list error: {e}")))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter_map(|key| key.strip_prefix(self.prefix.as_str()))
                    .map(String::from),
            );
        }

        keys.sort();
        debug!("Found {} keys under {prefix}", keys.len());
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(response) = self.get_object(key).await? else {
            return Ok(None);
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| s3_error(format!("Failed to read S3 object {key}: {e}")))?;

        Ok(Some(bytes.to_vec()))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let full_key = self.full_key(key);
        info!("Uploading s3://{}/{full_key}", self.bucket);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(body.into())
            .content_type(content_type)
            .metadata(UPLOADED_BY, uploader())
            .send()
            .await
            .map_err(|e| s3_error(format!("S3 put error for {full_key}: {e}")))?;

        Ok(())
    }

    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        let full_key = self.full_key(key);
        info!("Uploading {} to s3://{}/{full_key}", path.display(), self.bucket);

        let body = ByteStream::from_path(path).await.map_err(|e| {
            VtilesError::Store(StoreError::local(path, format!("Failed to open file: {e}")))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(body)
            .content_type(content_type)
            .metadata(UPLOADED_BY, uploader())
            .send()
            .await
            .map_err(|e| s3_error(format!("S3 put error for {full_key}: {e}")))?;

        Ok(())
    }

    async fn download_to(&self, key: &str, dest: &Path) -> Result<bool> {
        let Some(response) = self.get_object(key).await? else {
            return Ok(false);
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                VtilesError::Store(StoreError::local(parent, format!("Failed to create directory: {e}")))
            })?;
        }

        let mut file = fs::File::create(dest).await.map_err(|e| {
            VtilesError::Store(StoreError::local(dest, format!("Failed to create file: {e}")))
        })?;

        let mut reader = response.body.into_async_read();
        tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| s3_error(format!("Failed to download {key}: {e}")))?;

        debug!("Downloaded {key} to {}", dest.display());
        Ok(true)
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}
