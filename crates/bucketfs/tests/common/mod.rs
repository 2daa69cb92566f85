//! Shared helpers for bucketfs integration tests
//!
//! Object managers wrapping the in-memory [`Storage`] to observe or disturb
//! the remote calls a filesystem makes.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{self, SeekFrom};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bucketfs::store::{
    FileInfo, ObjectManager, ObjectStoreConfig, ObjectStoreError, Result, Storage,
};
use bucketfs::staging::{MemoryStaging, StagedFile, Staging};
use bucketfs::BucketFs;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn memory_storage() -> Storage {
    Storage::new(ObjectStoreConfig::Memory).unwrap()
}

/// Filesystem over `manager` with auto-sync turned on or off.
pub fn fs_over(manager: Arc<dyn ObjectManager>, auto_sync: bool) -> BucketFs {
    init_tracing();
    BucketFs::builder(manager, "test-bucket")
        .auto_sync(auto_sync)
        .build()
}

/// Counts the remote calls passing through to the wrapped storage.
#[derive(Debug)]
pub struct CountingManager {
    inner: Storage,
    gets: AtomicUsize,
    range_gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingManager {
    pub fn new() -> Self {
        Self {
            inner: memory_storage(),
            gets: AtomicUsize::new(0),
            range_gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.inner
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn range_gets(&self) -> usize {
        self.range_gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectManager for CountingManager {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn get_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        self.range_gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_range(key, start, end).await
    }

    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, content).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn stat(&self, key: &str) -> Result<FileInfo> {
        self.inner.stat(key).await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.inner.copy(from, to).await
    }

    async fn list(&self, dir: &str, limit: usize) -> Result<Vec<FileInfo>> {
        self.inner.list(dir, limit).await
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        self.inner.list_all(prefix).await
    }
}

/// Remote operations a [`FailingManager`] can be told to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Get,
    Put,
    Delete,
    Copy,
}

/// Rejects selected operations with `PermissionDenied`, passing the rest
/// through to the wrapped storage.
#[derive(Debug)]
pub struct FailingManager {
    inner: Storage,
    faults: Mutex<HashSet<Fault>>,
}

impl FailingManager {
    pub fn new() -> Self {
        Self {
            inner: memory_storage(),
            faults: Mutex::new(HashSet::new()),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.inner
    }

    pub fn fail(&self, fault: Fault) {
        self.faults.lock().insert(fault);
    }

    pub fn recover(&self, fault: Fault) {
        self.faults.lock().remove(&fault);
    }

    fn check(&self, fault: Fault, key: &str) -> Result<()> {
        if self.faults.lock().contains(&fault) {
            return Err(ObjectStoreError::PermissionDenied(key.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectManager for FailingManager {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.check(Fault::Get, key)?;
        self.inner.get(key).await
    }

    async fn get_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        self.check(Fault::Get, key)?;
        self.inner.get_range(key, start, end).await
    }

    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        self.check(Fault::Put, key)?;
        self.inner.put(key, content).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check(Fault::Delete, key)?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn stat(&self, key: &str) -> Result<FileInfo> {
        self.inner.stat(key).await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.check(Fault::Copy, from)?;
        self.inner.copy(from, to).await
    }

    async fn list(&self, dir: &str, limit: usize) -> Result<Vec<FileInfo>> {
        self.inner.list(dir, limit).await
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        self.inner.list_all(prefix).await
    }
}

/// Never completes data transfers; metadata calls pass through.
#[derive(Debug)]
pub struct StallingManager {
    inner: Storage,
}

impl StallingManager {
    pub fn new() -> Self {
        Self {
            inner: memory_storage(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.inner
    }
}

#[async_trait]
impl ObjectManager for StallingManager {
    async fn get(&self, _key: &str) -> Result<Bytes> {
        std::future::pending().await
    }

    async fn get_range(&self, _key: &str, _start: u64, _end: u64) -> Result<Bytes> {
        std::future::pending().await
    }

    async fn put(&self, _key: &str, _content: Bytes) -> Result<()> {
        std::future::pending().await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn stat(&self, key: &str) -> Result<FileInfo> {
        self.inner.stat(key).await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.inner.copy(from, to).await
    }

    async fn list(&self, dir: &str, limit: usize) -> Result<Vec<FileInfo>> {
        self.inner.list(dir, limit).await
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        self.inner.list_all(prefix).await
    }
}

/// Holds every `put` until [`GatedManager::open`] is called.
#[derive(Debug)]
pub struct GatedManager {
    inner: Storage,
    gate: Semaphore,
    entered: Notify,
}

impl GatedManager {
    pub fn new() -> Self {
        Self {
            inner: memory_storage(),
            gate: Semaphore::new(0),
            entered: Notify::new(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.inner
    }

    /// Wait until a `put` is parked at the gate.
    pub async fn wait_for_put(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.gate.add_permits(1024);
    }
}

#[async_trait]
impl ObjectManager for GatedManager {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.inner.get(key).await
    }

    async fn get_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        self.inner.get_range(key, start, end).await
    }

    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        self.entered.notify_one();
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.put(key, content).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn stat(&self, key: &str) -> Result<FileInfo> {
        self.inner.stat(key).await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.inner.copy(from, to).await
    }

    async fn list(&self, dir: &str, limit: usize) -> Result<Vec<FileInfo>> {
        self.inner.list(dir, limit).await
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        self.inner.list_all(prefix).await
    }
}

/// In-memory staging whose staged files always fail to close.
#[derive(Debug, Default)]
pub struct UnclosableStaging {
    inner: MemoryStaging,
}

impl UnclosableStaging {
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl Staging for UnclosableStaging {
    async fn exists(&self, key: &str) -> io::Result<bool> {
        self.inner.exists(key).await
    }

    async fn create(&self, key: &str) -> io::Result<Box<dyn StagedFile>> {
        let file = self.inner.create(key).await?;
        Ok(Box::new(Unclosable(file)))
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        self.inner.remove(key).await
    }
}

#[derive(Debug)]
struct Unclosable(Box<dyn StagedFile>);

#[async_trait]
impl StagedFile for Unclosable {
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf).await
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.0.read_at(buf, offset).await
    }

    async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.0.write_at(buf, offset).await
    }

    async fn len(&mut self) -> io::Result<u64> {
        self.0.len().await
    }

    async fn set_len(&mut self, size: u64) -> io::Result<()> {
        self.0.set_len(size).await
    }

    async fn close(self: Box<Self>) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "staged file refused to close"))
    }
}

/// Put `content` at `key` directly, bypassing any filesystem.
pub async fn seed(storage: &Storage, key: &str, content: &str) {
    storage
        .put(key, Bytes::copy_from_slice(content.as_bytes()))
        .await
        .unwrap();
}

/// Fetch `key` directly as a string.
pub async fn remote_string(storage: &Storage, key: &str) -> String {
    let data = storage.get(key).await.unwrap();
    String::from_utf8(data.to_vec()).unwrap()
}
