//! [`ObjectManager`] implementation over the `object_store` crate.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use tracing::{debug, info};

use crate::config::ObjectStoreConfig;
use crate::error::{ObjectStoreError, Result};
use crate::manager::ObjectManager;
use crate::meta::{is_dir_key, FileInfo, SEPARATOR};

/// Name of the zero-length object standing in for an explicit directory.
pub const DIR_MARKER: &str = ".keep";

/// Bucket storage backed by an `object_store` backend.
#[derive(Debug, Clone)]
pub struct Storage {
    inner: Arc<dyn ObjectStore>,
    bucket: String,
}

impl Storage {
    /// Create storage for the given backend configuration.
    pub fn new(config: ObjectStoreConfig) -> Result<Self> {
        let bucket = config.bucket_name();
        let inner: Arc<dyn ObjectStore> = match &config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),
            ObjectStoreConfig::Local { path } => {
                std::fs::create_dir_all(path)?;
                Arc::new(LocalFileSystem::new_with_prefix(path)?)
            }
            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let s3 = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(ObjectStoreConfig::region_or_default(region))
                    .with_allow_http(endpoint.starts_with("http://"))
                    .build()?;
                Arc::new(s3)
            }
        };

        info!(bucket = %bucket, "object storage ready");
        Ok(Self { inner, bucket })
    }

    /// Wrap an existing `object_store` backend.
    pub fn from_store(inner: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            inner,
            bucket: bucket.into(),
        }
    }

    /// Name of the bucket this storage is bound to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Backend location of `key`. Directory keys map to their marker object.
    fn location(key: &str) -> Path {
        if is_dir_key(key) {
            Self::prefix(key).child(DIR_MARKER)
        } else {
            Path::from(key)
        }
    }

    /// Backend prefix for a directory key (separator optional).
    fn prefix(key: &str) -> Path {
        Path::from(key.trim_end_matches(SEPARATOR))
    }

    fn prefix_arg(prefix: &Path) -> Option<&Path> {
        let raw: &str = prefix.as_ref();
        if raw.is_empty() {
            None
        } else {
            Some(prefix)
        }
    }

    /// Convert backend metadata back into bucket-key metadata.
    fn to_info(meta: &ObjectMeta) -> FileInfo {
        let raw: &str = meta.location.as_ref();
        let key = if meta.location.filename() == Some(DIR_MARKER) {
            raw.strip_suffix(DIR_MARKER).unwrap_or(raw).to_string()
        } else {
            raw.to_string()
        };
        FileInfo::new(key, meta.size as u64, meta.last_modified)
    }

    /// Whether any object lives under the directory prefix.
    async fn has_children(&self, key: &str) -> Result<bool> {
        let prefix = Self::prefix(key);
        let listing = self
            .inner
            .list_with_delimiter(Self::prefix_arg(&prefix))
            .await
            .map_err(|e| ObjectStoreError::from_backend(key, e))?;
        Ok(!listing.objects.is_empty() || !listing.common_prefixes.is_empty())
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta> {
        self.inner
            .head(&Self::location(key))
            .await
            .map_err(|e| ObjectStoreError::from_backend(key, e))
    }
}

#[async_trait]
impl ObjectManager for Storage {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let result = self
            .inner
            .get(&Self::location(key))
            .await
            .map_err(|e| ObjectStoreError::from_backend(key, e))?;
        let data = result
            .bytes()
            .await
            .map_err(|e| ObjectStoreError::from_backend(key, e))?;
        debug!(key, size = data.len(), "fetched object");
        Ok(data)
    }

    async fn get_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        // Backends disagree on ranges past the end, so clamp against the
        // real size first.
        let size = self.head(key).await?.size as u64;
        let end = end.min(size);
        if start >= end {
            return Ok(Bytes::new());
        }
        self.inner
            .get_range(&Self::location(key), start as usize..end as usize)
            .await
            .map_err(|e| ObjectStoreError::from_backend(key, e))
    }

    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        let size = content.len();
        self.inner
            .put(&Self::location(key), PutPayload::from(content))
            .await
            .map_err(|e| ObjectStoreError::from_backend(key, e))?;
        debug!(key, size, "stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner
            .delete(&Self::location(key))
            .await
            .map_err(|e| ObjectStoreError::from_backend(key, e))?;
        debug!(key, "deleted object");
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(true);
        }
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound(_)) if is_dir_key(key) => self.has_children(key).await,
            Err(ObjectStoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn stat(&self, key: &str) -> Result<FileInfo> {
        if key.is_empty() {
            return Ok(FileInfo::new(key, 0, DateTime::<Utc>::default()));
        }
        match self.head(key).await {
            Ok(meta) => Ok(FileInfo::new(key, meta.size as u64, meta.last_modified)),
            Err(ObjectStoreError::NotFound(_)) if is_dir_key(key) => {
                if self.has_children(key).await? {
                    Ok(FileInfo::new(key, 0, DateTime::<Utc>::default()))
                } else {
                    Err(ObjectStoreError::NotFound(key.to_string()))
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.inner
            .copy(&Self::location(from), &Self::location(to))
            .await
            .map_err(|e| ObjectStoreError::from_backend(from, e))?;
        debug!(from, to, "copied object");
        Ok(())
    }

    async fn list(&self, dir: &str, limit: usize) -> Result<Vec<FileInfo>> {
        let prefix = Self::prefix(dir);
        let listing = self
            .inner
            .list_with_delimiter(Self::prefix_arg(&prefix))
            .await
            .map_err(|e| ObjectStoreError::from_backend(dir, e))?;

        let mut entries: Vec<FileInfo> = listing
            .objects
            .iter()
            .filter(|meta| meta.location.filename() != Some(DIR_MARKER))
            .map(Self::to_info)
            .chain(listing.common_prefixes.iter().map(|p| {
                FileInfo::new(
                    format!("{}{}", p, SEPARATOR),
                    0,
                    DateTime::<Utc>::default(),
                )
            }))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        if limit > 0 {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        let backend_prefix = Self::prefix(prefix);
        let metas: Vec<ObjectMeta> = self
            .inner
            .list(Self::prefix_arg(&backend_prefix))
            .try_collect()
            .await
            .map_err(|e| ObjectStoreError::from_backend(prefix, e))?;

        let mut entries: Vec<FileInfo> = metas.iter().map(Self::to_info).collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
