//! Local staging area for objects being modified
//!
//! Object stores only accept whole-object replaces, so the first write to a
//! handle copies the remote object into a staged file where random-offset
//! mutation is cheap. The staged file is uploaded back on sync.
//!
//! # Backends
//!
//! - [`MemoryStaging`]: staged copies held in process memory (default)
//! - [`DiskStaging`]: staged copies held as files under a local directory

mod disk;
mod memory;

pub use disk::DiskStaging;
pub use memory::MemoryStaging;

use std::io::{self, SeekFrom};

use async_trait::async_trait;

/// Scratch area of staged files, keyed by bucket key.
#[async_trait]
pub trait Staging: Send + Sync + std::fmt::Debug {
    /// Check if a staged entry exists for `key`.
    async fn exists(&self, key: &str) -> io::Result<bool>;

    /// Create an empty staged file for `key`, replacing any previous entry.
    async fn create(&self, key: &str) -> io::Result<Box<dyn StagedFile>>;

    /// Remove the staged entry for `key`.
    async fn remove(&self, key: &str) -> io::Result<()>;
}

/// A random-access staged file with its own cursor.
#[async_trait]
pub trait StagedFile: Send + Sync + std::fmt::Debug {
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Read at the cursor, advancing it.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf` at the cursor, advancing it.
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Read at `offset` without moving the cursor.
    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Write at `offset` without moving the cursor, zero-filling any gap
    /// past the current end.
    async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    async fn len(&mut self) -> io::Result<u64>;

    /// Truncate or zero-extend to exactly `size` bytes.
    async fn set_len(&mut self, size: u64) -> io::Result<()>;

    async fn close(self: Box<Self>) -> io::Result<()>;

    /// Read everything from the start, leaving the cursor where it was.
    async fn contents(&mut self) -> io::Result<Vec<u8>> {
        let saved = self.seek(SeekFrom::Current(0)).await?;
        self.seek(SeekFrom::Start(0)).await?;

        let mut out = Vec::with_capacity(self.len().await? as usize);
        let mut chunk = vec![0u8; 64 * 1024];
        let result = loop {
            match self.read(&mut chunk).await {
                Ok(0) => break Ok(()),
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        };

        self.seek(SeekFrom::Start(saved)).await?;
        result.map(|_| out)
    }
}

/// Reject keys that would escape a staging root.
pub(crate) fn check_key(key: &str) -> io::Result<()> {
    if key.is_empty() || key.split('/').any(|segment| segment == "..") {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid staging key: {key:?}"),
        ));
    }
    Ok(())
}
