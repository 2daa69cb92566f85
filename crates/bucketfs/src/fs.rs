use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use store::{FileInfo, ObjectManager, Storage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FsConfig;
use crate::error::{FsError, Result};
use crate::file::File;
use crate::flags::OpenFlags;
use crate::path::{ensure_dir, is_dir_key, normalize};
use crate::staging::{MemoryStaging, Staging};

/// State shared by the filesystem facade and every handle it hands out.
pub(crate) struct Shared {
    pub(crate) manager: Arc<dyn ObjectManager>,
    pub(crate) staging: Arc<dyn Staging>,
    pub(crate) bucket: String,
    pub(crate) auto_sync: bool,
    cancel: CancellationToken,
    open_files: Mutex<HashMap<String, Arc<File>>>,
}

impl Shared {
    /// Run a remote call, failing fast once the filesystem is cancelled.
    pub(crate) async fn remote<T>(
        &self,
        call: impl Future<Output = store::Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FsError::Cancelled),
            result = call => Ok(result?),
        }
    }

    fn lookup(&self, key: &str) -> Option<Arc<File>> {
        self.open_files.lock().get(key).cloned()
    }

    /// Register `file`, or return the handle a concurrent opener won with.
    fn register(&self, file: File) -> Arc<File> {
        let mut files = self.open_files.lock();
        files
            .entry(file.name().to_string())
            .or_insert_with(|| Arc::new(file))
            .clone()
    }

    /// Drop the registry entry for `file` if it is still the registered one.
    pub(crate) fn unregister(&self, file: &File) {
        let mut files = self.open_files.lock();
        let registered = files
            .get(file.name())
            .is_some_and(|open| std::ptr::eq(open.as_ref(), file));
        if registered {
            files.remove(file.name());
        }
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("bucket", &self.bucket)
            .field("auto_sync", &self.auto_sync)
            .field("open_files", &self.open_files.lock().len())
            .finish_non_exhaustive()
    }
}

/// Filesystem facade over a single bucket.
///
/// Hands out at most one live [`File`] per normalized key. Cloning is cheap
/// and clones share the same registry.
#[derive(Debug, Clone)]
pub struct BucketFs {
    shared: Arc<Shared>,
}

/// Builder for [`BucketFs`].
pub struct BucketFsBuilder {
    manager: Arc<dyn ObjectManager>,
    bucket: String,
    staging: Option<Arc<dyn Staging>>,
    auto_sync: bool,
    cancel: Option<CancellationToken>,
}

impl BucketFsBuilder {
    /// Staging area for modified objects (in-memory by default).
    pub fn staging(mut self, staging: Arc<dyn Staging>) -> Self {
        self.staging = Some(staging);
        self
    }

    /// Upload after every write and truncate (on by default).
    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = enabled;
        self
    }

    /// Token that aborts in-flight and future remote calls when cancelled.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> BucketFs {
        let staging = self
            .staging
            .unwrap_or_else(|| Arc::new(MemoryStaging::new()));

        debug!(bucket = %self.bucket, auto_sync = self.auto_sync, "bucketfs created");
        BucketFs {
            shared: Arc::new(Shared {
                manager: self.manager,
                staging,
                bucket: self.bucket,
                auto_sync: self.auto_sync,
                cancel: self.cancel.unwrap_or_default(),
                open_files: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl BucketFs {
    pub fn builder(manager: Arc<dyn ObjectManager>, bucket: impl Into<String>) -> BucketFsBuilder {
        BucketFsBuilder {
            manager,
            bucket: bucket.into(),
            staging: None,
            auto_sync: true,
            cancel: None,
        }
    }

    /// Filesystem with the default staging area and auto-sync enabled.
    pub fn new(manager: Arc<dyn ObjectManager>, bucket: impl Into<String>) -> Self {
        Self::builder(manager, bucket).build()
    }

    /// Build the storage backend and staging area described by `config`.
    pub fn from_config(config: &FsConfig) -> Result<Self> {
        let storage = Storage::new(config.store.clone())?;
        let bucket = storage.bucket().to_string();
        let staging = config.staging.build()?;

        info!(bucket = %bucket, auto_sync = config.auto_sync, "opening bucket");
        Ok(Self::builder(Arc::new(storage), bucket)
            .staging(staging)
            .auto_sync(config.auto_sync)
            .build())
    }

    pub fn name(&self) -> &'static str {
        "BucketFs"
    }

    pub fn bucket(&self) -> &str {
        &self.shared.bucket
    }

    pub fn auto_sync(&self) -> bool {
        self.shared.auto_sync
    }

    /// Token cancelling every remote call made through this filesystem.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    /// Open `path` with `flags`.
    ///
    /// An already open key returns the registered handle as is, whatever
    /// `flags` asks for. Otherwise the open may create the object (CREATE),
    /// refuse an existing one (CREATE | EXCLUSIVE) or empty it (TRUNCATE).
    pub async fn open_file(&self, path: &str, flags: OpenFlags) -> Result<Arc<File>> {
        let key = normalize(path);
        if let Some(file) = self.shared.lookup(&key) {
            debug!(key = %key, "open hit registered handle");
            return Ok(file);
        }

        let manager = &self.shared.manager;
        let exists = self.shared.remote(manager.exists(&key)).await?;
        if !exists {
            if !flags.contains(OpenFlags::CREATE) {
                return Err(FsError::NotFound(key));
            }
            self.shared.remote(manager.put(&key, Bytes::new())).await?;
            debug!(key = %key, "created empty object");
        } else if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUSIVE) {
            return Err(FsError::AlreadyExists(key));
        } else if flags.contains(OpenFlags::TRUNCATE) && !is_dir_key(&key) {
            self.shared.remote(manager.put(&key, Bytes::new())).await?;
            debug!(key = %key, "truncated object on open");
        }

        Ok(self
            .shared
            .register(File::new(key, flags, self.shared.clone())))
    }

    /// Open `path` read-only.
    pub async fn open(&self, path: &str) -> Result<Arc<File>> {
        self.open_file(path, OpenFlags::READ).await
    }

    /// Create or empty `path` and open it read-write.
    ///
    /// When `path` is already open the registered handle is returned, with
    /// any unsynced writes discarded and its cursor rewound, so it agrees
    /// with the now empty object.
    pub async fn create(&self, path: &str) -> Result<Arc<File>> {
        let key = normalize(path);
        self.shared
            .remote(self.shared.manager.put(&key, Bytes::new()))
            .await?;

        let flags = OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE;
        let file = self
            .shared
            .register(File::new(key, flags, self.shared.clone()));
        file.reset().await?;
        Ok(file)
    }

    pub async fn remove(&self, path: &str) -> Result<()> {
        let key = normalize(path);
        self.shared.remote(self.shared.manager.delete(&key)).await?;
        debug!(key = %key, "removed");
        Ok(())
    }

    /// Delete every object under `path`. Stops at the first failed delete.
    pub async fn remove_all(&self, path: &str) -> Result<()> {
        let key = normalize(path);
        let manager = &self.shared.manager;

        let entries = self.shared.remote(manager.list_all(&ensure_dir(&key))).await?;
        for entry in &entries {
            self.shared.remote(manager.delete(&entry.key)).await?;
        }

        if !is_dir_key(&key) {
            match self.shared.remote(manager.delete(&key)).await {
                Err(err) if err.is_not_found() => {}
                other => other?,
            }
        }

        debug!(key = %key, removed = entries.len(), "removed recursively");
        Ok(())
    }

    /// Copy `old` to `new`, then delete `old`.
    pub async fn rename(&self, old: &str, new: &str) -> Result<()> {
        let from = normalize(old);
        let to = normalize(new);
        let manager = &self.shared.manager;

        self.shared.remote(manager.copy(&from, &to)).await?;
        if let Err(err) = self.shared.remote(manager.delete(&from)).await {
            warn!(from = %from, to = %to, error = %err, "rename copied but could not delete source");
            return Err(err);
        }
        debug!(from = %from, to = %to, "renamed");
        Ok(())
    }

    pub async fn stat(&self, path: &str) -> Result<FileInfo> {
        let key = normalize(path);
        self.shared.remote(self.shared.manager.stat(&key)).await
    }

    /// Create a single directory, failing if it already exists.
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        let key = ensure_dir(path);
        if self.shared.remote(self.shared.manager.exists(&key)).await? {
            return Err(FsError::AlreadyExists(key));
        }
        self.mkdir_all(path).await
    }

    /// Write the directory marker for `path`. Object stores need no parents.
    pub async fn mkdir_all(&self, path: &str) -> Result<()> {
        let key = ensure_dir(path);
        if key.is_empty() {
            return Ok(());
        }
        self.shared
            .remote(self.shared.manager.put(&key, Bytes::new()))
            .await?;
        debug!(key = %key, "created directory");
        Ok(())
    }

    pub async fn chmod(&self, _path: &str, _mode: u32) -> Result<()> {
        Err(FsError::NotImplemented("Chmod"))
    }

    pub async fn chown(&self, _path: &str, _uid: u32, _gid: u32) -> Result<()> {
        Err(FsError::NotImplemented("Chown"))
    }

    pub async fn chtimes(
        &self,
        _path: &str,
        _accessed: DateTime<Utc>,
        _modified: DateTime<Utc>,
    ) -> Result<()> {
        Err(FsError::NotImplemented("Chtimes"))
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.shared.lookup(&normalize(path)).is_some()
    }

    pub fn open_count(&self) -> usize {
        self.shared.open_files.lock().len()
    }

    /// Close every open handle, returning the first error after trying all.
    pub async fn close_all(&self) -> Result<()> {
        let files: Vec<Arc<File>> = self.shared.open_files.lock().values().cloned().collect();

        let mut first_err = None;
        for file in files {
            if let Err(err) = file.close().await {
                warn!(key = %file.name(), error = %err, "failed to close handle");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
