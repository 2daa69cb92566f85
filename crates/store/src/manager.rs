use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::meta::FileInfo;

/// Remote bucket operations consumed by the filesystem layer.
///
/// Keys are normalized bucket keys: no leading separator, directories end
/// with `/`. Implementations must report a missing object as
/// [`ObjectStoreError::NotFound`](crate::ObjectStoreError::NotFound) so the
/// caller can tell it apart from transport failures.
#[async_trait]
pub trait ObjectManager: Send + Sync + std::fmt::Debug {
    /// Fetch the whole object.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Fetch the half-open byte range `[start, end)`.
    ///
    /// The range is clamped to the object size, so a range starting at or
    /// past the end yields an empty buffer rather than an error.
    async fn get_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes>;

    /// Replace the whole object with `content`.
    async fn put(&self, key: &str, content: Bytes) -> Result<()>;

    /// Delete a single object.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if an object (or directory prefix) exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Fetch object metadata.
    async fn stat(&self, key: &str) -> Result<FileInfo>;

    /// Server-side copy of `from` to `to`.
    async fn copy(&self, from: &str, to: &str) -> Result<()>;

    /// List the direct children of the directory `dir`.
    ///
    /// # Arguments
    /// * `dir` - Directory key (with or without the trailing separator)
    /// * `limit` - Maximum number of entries, 0 for all
    async fn list(&self, dir: &str, limit: usize) -> Result<Vec<FileInfo>>;

    /// Recursively list every object under `prefix`.
    async fn list_all(&self, prefix: &str) -> Result<Vec<FileInfo>>;
}
