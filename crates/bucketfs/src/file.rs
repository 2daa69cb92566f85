//! File handles over bucket objects
//!
//! Reads go straight to the object store as ranged requests. The first write
//! (or truncate) downloads the whole object into a staged copy, which takes
//! every later mutation until [`File::sync`] uploads it back as a single
//! whole-object replace. While the handle is dirty, reads and metadata are
//! served from the staged copy so a handle always sees its own writes.

use std::fmt;
use std::io::SeekFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use store::FileInfo;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{FsError, Result};
use crate::flags::OpenFlags;
use crate::fs::Shared;
use crate::path::{ensure_dir, is_dir_key};
use crate::staging::StagedFile;

/// Raw whence values accepted by [`File::seek_whence`].
pub const SEEK_START: i32 = 0;
pub const SEEK_CURRENT: i32 = 1;
pub const SEEK_END: i32 = 2;

struct FileState {
    offset: u64,
    dirty: bool,
    staged: Option<Box<dyn StagedFile>>,
    modified: DateTime<Utc>,
}

/// Bytes a staged mutation is about to overwrite or cut off, kept so a failed
/// auto-sync can put the staged copy back.
struct Undo {
    len: u64,
    offset: u64,
    saved: Vec<u8>,
}

impl Undo {
    /// Save `[offset, offset + span)` clamped to the current length.
    async fn capture(staged: &mut dyn StagedFile, offset: u64, span: u64) -> Result<Self> {
        let len = staged.len().await?;
        let end = offset.saturating_add(span).min(len);
        let mut saved = vec![0u8; end.saturating_sub(offset) as usize];
        if !saved.is_empty() {
            let n = staged.read_at(&mut saved, offset).await?;
            saved.truncate(n);
        }
        Ok(Self { len, offset, saved })
    }

    async fn restore(self, staged: &mut dyn StagedFile) -> std::io::Result<()> {
        if !self.saved.is_empty() {
            staged.write_at(&self.saved, self.offset).await?;
        }
        staged.set_len(self.len).await
    }
}

/// An open file or directory in a bucket.
///
/// Handles are shared: opening the same key twice yields the same `Arc`.
/// All mutable state sits behind one async lock, so a handle can be used
/// from several tasks at once.
pub struct File {
    name: String,
    flags: OpenFlags,
    is_dir: bool,
    closed: AtomicBool,
    state: Mutex<FileState>,
    shared: Arc<Shared>,
}

impl File {
    pub(crate) fn new(name: String, flags: OpenFlags, shared: Arc<Shared>) -> Self {
        let is_dir = is_dir_key(&name);
        Self {
            name,
            flags,
            is_dir,
            closed: AtomicBool::new(false),
            state: Mutex::new(FileState {
                offset: 0,
                dirty: false,
                staged: None,
                modified: Utc::now(),
            }),
            shared,
        }
    }

    /// Normalized bucket key of this handle.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn is_readable(&self) -> bool {
        !self.is_closed() && self.flags.readable()
    }

    pub fn is_writeable(&self) -> bool {
        !self.is_closed() && self.flags.writeable()
    }

    pub fn is_append_only(&self) -> bool {
        self.is_writeable() && self.flags.append_only()
    }

    /// Fails once the handle is closed. Call with the state lock held, since
    /// `close` may have run while the caller waited for it.
    fn check_open(&self, op: &'static str) -> Result<()> {
        if self.is_closed() {
            return Err(FsError::denied(op, &self.name));
        }
        Ok(())
    }

    /// Whether the handle holds writes not yet uploaded.
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    /// Current cursor position.
    pub async fn offset(&self) -> u64 {
        self.state.lock().await.offset
    }

    /// Read at the cursor and advance it by the bytes read.
    ///
    /// Returns `Ok(0)` at the end of the object.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if !self.is_readable() || self.is_dir {
            return Err(FsError::denied("read", &self.name));
        }

        let mut state = self.state.lock().await;
        self.check_open("read")?;
        let offset = state.offset;
        let n = if state.dirty {
            Self::read_staged(&mut state, buf, offset).await?
        } else {
            self.read_remote(buf, offset).await?
        };
        state.offset += n as u64;
        Ok(n)
    }

    /// Read up to `buf.len()` bytes at `offset` without touching the cursor.
    pub async fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        if !self.is_readable() || self.is_dir {
            return Err(FsError::denied("read_at", &self.name));
        }
        let offset = u64::try_from(offset).map_err(|_| FsError::OutOfRange(offset))?;

        let mut state = self.state.lock().await;
        self.check_open("read_at")?;
        if state.dirty {
            return Self::read_staged(&mut state, buf, offset).await;
        }
        drop(state);

        self.read_remote(buf, offset).await
    }

    async fn read_remote(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let end = offset.saturating_add(buf.len() as u64);
        let data = self
            .shared
            .remote(self.shared.manager.get_range(&self.name, offset, end))
            .await?;

        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    async fn read_staged(state: &mut FileState, buf: &mut [u8], offset: u64) -> Result<usize> {
        match state.staged.as_mut() {
            Some(staged) => Ok(staged.read_at(buf, offset).await?),
            None => Ok(0),
        }
    }

    /// Move the cursor. Targets before the start or past the end fail with
    /// [`FsError::OutOfRange`].
    pub async fn seek(&self, pos: SeekFrom) -> Result<u64> {
        if (!self.is_readable() && !self.is_writeable()) || self.is_dir {
            return Err(FsError::denied("seek", &self.name));
        }

        let mut state = self.state.lock().await;
        self.check_open("seek")?;
        let size = self.stat_locked(&mut state).await?.size as i64;

        let target = match pos {
            SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            SeekFrom::Current(delta) => (state.offset as i64).saturating_add(delta),
            SeekFrom::End(delta) => size.saturating_add(delta),
        };
        if target < 0 || target > size {
            return Err(FsError::OutOfRange(target));
        }

        state.offset = target as u64;
        Ok(state.offset)
    }

    /// [`seek`](Self::seek) with a raw offset and whence
    /// ([`SEEK_START`], [`SEEK_CURRENT`] or [`SEEK_END`]).
    pub async fn seek_whence(&self, offset: i64, whence: i32) -> Result<u64> {
        if (!self.is_readable() && !self.is_writeable()) || self.is_dir {
            return Err(FsError::denied("seek", &self.name));
        }

        let pos = match whence {
            SEEK_START if offset < 0 => return Err(FsError::OutOfRange(offset)),
            SEEK_START => SeekFrom::Start(offset as u64),
            SEEK_CURRENT => SeekFrom::Current(offset),
            SEEK_END => SeekFrom::End(offset),
            other => {
                return Err(FsError::InvalidArgument(format!(
                    "invalid whence value: {other}"
                )))
            }
        };
        self.seek(pos).await
    }

    /// Write at the cursor, or at the end of the object in append mode.
    ///
    /// Append-mode writes leave the cursor where it was.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        if !self.is_writeable() || self.is_dir {
            return Err(FsError::denied("write", &self.name));
        }

        let mut state = self.state.lock().await;
        self.check_open("write")?;
        if self.is_append_only() {
            let end = self.stat_locked(&mut state).await?.size;
            return self.write_locked(&mut state, buf, end).await;
        }

        let offset = state.offset;
        let n = self.write_locked(&mut state, buf, offset).await?;
        state.offset += n as u64;
        Ok(n)
    }

    /// Write at `offset` without touching the cursor. Not allowed in append
    /// mode.
    pub async fn write_at(&self, buf: &[u8], offset: i64) -> Result<usize> {
        if !self.is_writeable() || self.is_append_only() {
            return Err(FsError::denied("write_at", &self.name));
        }
        let offset = u64::try_from(offset).map_err(|_| FsError::OutOfRange(offset))?;

        let mut state = self.state.lock().await;
        self.check_open("write_at")?;
        self.write_locked(&mut state, buf, offset).await
    }

    pub async fn write_str(&self, s: &str) -> Result<usize> {
        self.write(s.as_bytes()).await
    }

    async fn write_locked(&self, state: &mut FileState, buf: &[u8], offset: u64) -> Result<usize> {
        if self.is_dir {
            return Err(FsError::denied("write", &self.name));
        }

        let staged = self.staged(state).await?;
        let undo = if self.shared.auto_sync {
            Some(Undo::capture(staged.as_mut(), offset, buf.len() as u64).await?)
        } else {
            None
        };
        let n = staged.write_at(buf, offset).await?;

        self.commit(state, undo).await?;
        Ok(n)
    }

    /// Mark the staged copy modified and, with auto-sync, upload it. A failed
    /// upload restores the staged copy so the handle looks untouched.
    async fn commit(&self, state: &mut FileState, undo: Option<Undo>) -> Result<()> {
        let (was_dirty, was_modified) = (state.dirty, state.modified);
        state.dirty = true;
        state.modified = Utc::now();

        let Some(undo) = undo else {
            return Ok(());
        };
        let Err(err) = self.sync_locked(state).await else {
            return Ok(());
        };

        if let Some(staged) = state.staged.as_mut() {
            match undo.restore(staged.as_mut()).await {
                Ok(()) => {
                    state.dirty = was_dirty;
                    state.modified = was_modified;
                }
                Err(restore) => {
                    warn!(key = %self.name, error = %restore, "failed to restore staged copy");
                }
            }
        }
        Err(err)
    }

    /// Resize the object to exactly `size` bytes, zero-extending if needed.
    /// The cursor does not move.
    pub async fn truncate(&self, size: i64) -> Result<()> {
        if !self.is_writeable() || self.is_dir {
            return Err(FsError::denied("truncate", &self.name));
        }
        let size = u64::try_from(size).map_err(|_| FsError::OutOfRange(size))?;

        let mut state = self.state.lock().await;
        self.check_open("truncate")?;
        let staged = self.staged(&mut state).await?;
        let undo = if self.shared.auto_sync {
            Some(Undo::capture(staged.as_mut(), size, u64::MAX).await?)
        } else {
            None
        };
        staged.set_len(size).await?;

        self.commit(&mut state, undo).await
    }

    /// The staged copy, downloading the remote object into one on first use.
    async fn staged<'a>(&self, state: &'a mut FileState) -> Result<&'a mut Box<dyn StagedFile>> {
        if state.staged.is_none() {
            let staged = self.materialize(state.offset).await?;
            state.staged = Some(staged);
        }
        state
            .staged
            .as_mut()
            .ok_or_else(|| FsError::AccessDenied(self.name.clone()))
    }

    async fn materialize(&self, offset: u64) -> Result<Box<dyn StagedFile>> {
        let staging = &self.shared.staging;
        if staging.exists(&self.name).await? {
            staging.remove(&self.name).await?;
        }

        let mut staged = staging.create(&self.name).await?;
        let copied = async {
            let content = self
                .shared
                .remote(self.shared.manager.get(&self.name))
                .await?;
            staged.write(&content).await?;
            staged.seek(SeekFrom::Start(offset)).await?;
            Ok::<_, FsError>(content.len())
        }
        .await;

        match copied {
            Ok(size) => {
                debug!(key = %self.name, size, "staged object for writing");
                Ok(staged)
            }
            Err(err) => {
                if let Err(cleanup) = staged.close().await {
                    warn!(key = %self.name, error = %cleanup, "failed to close staged copy");
                }
                if let Err(cleanup) = staging.remove(&self.name).await {
                    warn!(key = %self.name, error = %cleanup, "failed to remove staged copy");
                }
                Err(err)
            }
        }
    }

    /// Upload the staged copy if it holds unsynced writes.
    pub async fn sync(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.sync_locked(&mut state).await
    }

    async fn sync_locked(&self, state: &mut FileState) -> Result<()> {
        if !state.dirty {
            return Ok(());
        }
        let Some(staged) = state.staged.as_mut() else {
            return Ok(());
        };

        let content = Bytes::from(staged.contents().await?);
        let size = content.len();
        self.shared
            .remote(self.shared.manager.put(&self.name, content))
            .await?;

        state.dirty = false;
        debug!(key = %self.name, size, "synced staged copy");
        Ok(())
    }

    /// Sync, release the staged copy and drop the handle from its registry.
    ///
    /// A failed sync leaves the handle open. Closing twice fails with
    /// [`FsError::PermissionDenied`].
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if self.is_closed() {
            return Err(FsError::denied("close", &self.name));
        }

        self.sync_locked(&mut state).await?;
        self.shared.unregister(self);

        let staged = state.staged.take();
        state.dirty = false;
        self.closed.store(true, Ordering::Release);

        if let Some(staged) = staged {
            let closed = staged.close().await;
            let removed = self.shared.staging.remove(&self.name).await;
            closed?;
            removed?;
        }
        debug!(key = %self.name, "closed");
        Ok(())
    }

    /// Forget the staged copy and rewind, after the remote object was
    /// replaced behind this handle's back.
    pub(crate) async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.offset = 0;
        state.dirty = false;

        if let Some(staged) = state.staged.take() {
            debug!(key = %self.name, "discarding staged copy");
            let closed = staged.close().await;
            let removed = self.shared.staging.remove(&self.name).await;
            closed?;
            removed?;
        }
        Ok(())
    }

    /// Metadata for this handle, from the staged copy while dirty.
    pub async fn stat(&self) -> Result<FileInfo> {
        if self.is_closed() {
            return Err(FsError::AccessDenied(self.name.clone()));
        }
        let mut state = self.state.lock().await;
        if self.is_closed() {
            return Err(FsError::AccessDenied(self.name.clone()));
        }
        self.stat_locked(&mut state).await
    }

    async fn stat_locked(&self, state: &mut FileState) -> Result<FileInfo> {
        if !state.dirty {
            return self
                .shared
                .remote(self.shared.manager.stat(&self.name))
                .await;
        }

        let modified = state.modified;
        match state.staged.as_mut() {
            Some(staged) => Ok(FileInfo::new(
                self.name.clone(),
                staged.len().await?,
                modified,
            )),
            None => Err(FsError::AccessDenied(self.name.clone())),
        }
    }

    /// List up to `count` entries of this directory, 0 for all.
    pub async fn readdir(&self, count: usize) -> Result<Vec<FileInfo>> {
        if !self.is_readable() || !self.is_dir {
            return Err(FsError::denied("readdir", &self.name));
        }
        self.shared
            .remote(self.shared.manager.list(&ensure_dir(&self.name), count))
            .await
    }

    pub async fn readdirnames(&self, count: usize) -> Result<Vec<String>> {
        let entries = self.readdir(count).await?;
        Ok(entries.iter().map(|info| info.name().to_string()).collect())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("is_dir", &self.is_dir)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BucketFs;
    use store::{ObjectManager, ObjectStoreConfig, Storage};

    async fn setup(auto_sync: bool) -> (BucketFs, Arc<Storage>) {
        let storage = Arc::new(Storage::new(ObjectStoreConfig::Memory).unwrap());
        let fs = BucketFs::builder(storage.clone(), "test-bucket")
            .auto_sync(auto_sync)
            .build();
        (fs, storage)
    }

    async fn seed(storage: &Storage, key: &str, content: &str) {
        storage
            .put(key, Bytes::copy_from_slice(content.as_bytes()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_flags_predicates() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "flags.txt", "").await;

        let file = fs
            .open_file("flags.txt", OpenFlags::WRITE | OpenFlags::APPEND)
            .await
            .unwrap();
        assert!(!file.is_readable());
        assert!(file.is_writeable());
        assert!(file.is_append_only());

        file.close().await.unwrap();
        assert!(!file.is_readable());
        assert!(!file.is_writeable());
        assert!(!file.is_append_only());
    }

    #[tokio::test]
    async fn test_read_sequential() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "read.txt", "hello world").await;

        let file = fs.open("read.txt").await.unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(file.read(&mut buf).await.unwrap(), 6);
        assert_eq!(&buf, b"hello ");
        assert_eq!(file.offset().await, 6);

        assert_eq!(file.read(&mut buf).await.unwrap(), 5);
        assert_eq!(&buf[..5], b"world");
        assert_eq!(file.read(&mut buf).await.unwrap(), 0);
        assert_eq!(file.offset().await, 11);
    }

    #[tokio::test]
    async fn test_read_at() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "read_at.txt", "0123456789").await;

        let file = fs.open("read_at.txt").await.unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(file.read_at(&mut buf, 3).await.unwrap(), 4);
        assert_eq!(&buf, b"3456");
        assert_eq!(file.read_at(&mut buf, 8).await.unwrap(), 2);
        assert_eq!(file.read_at(&mut buf, 20).await.unwrap(), 0);
        assert_eq!(file.offset().await, 0);

        assert!(matches!(
            file.read_at(&mut buf, -1).await,
            Err(FsError::OutOfRange(-1))
        ));
    }

    #[tokio::test]
    async fn test_write_only_handle_cannot_read() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "wo.txt", "secret").await;

        let file = fs.open_file("wo.txt", OpenFlags::WRITE).await.unwrap();
        let mut buf = [0u8; 4];
        assert!(file.read(&mut buf).await.unwrap_err().is_permission_denied());
        assert!(file.read_at(&mut buf, 0).await.unwrap_err().is_permission_denied());
    }

    #[tokio::test]
    async fn test_read_only_handle_cannot_write() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "ro.txt", "content").await;

        let file = fs.open("ro.txt").await.unwrap();
        assert!(file.write(b"x").await.unwrap_err().is_permission_denied());
        assert!(file.write_at(b"x", 0).await.unwrap_err().is_permission_denied());
        assert!(file.truncate(0).await.unwrap_err().is_permission_denied());
        assert!(!file.is_dirty().await);
    }

    #[tokio::test]
    async fn test_seek_bounds() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "seek.txt", "0123456789").await;
        let file = fs.open("seek.txt").await.unwrap();

        assert!(matches!(
            file.seek_whence(11, SEEK_START).await,
            Err(FsError::OutOfRange(11))
        ));
        assert!(matches!(
            file.seek_whence(-1, SEEK_START).await,
            Err(FsError::OutOfRange(-1))
        ));
        assert_eq!(file.seek_whence(0, SEEK_START).await.unwrap(), 0);
        assert_eq!(file.seek_whence(5, SEEK_CURRENT).await.unwrap(), 5);
        assert_eq!(file.seek_whence(-2, SEEK_CURRENT).await.unwrap(), 3);
        assert_eq!(file.seek_whence(0, SEEK_END).await.unwrap(), 10);
        assert_eq!(file.seek(SeekFrom::End(-4)).await.unwrap(), 6);
        assert!(matches!(
            file.seek(SeekFrom::End(1)).await,
            Err(FsError::OutOfRange(11))
        ));
        assert_eq!(file.offset().await, 6);
    }

    #[tokio::test]
    async fn test_seek_invalid_whence() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "whence.txt", "abc").await;
        let file = fs.open("whence.txt").await.unwrap();

        let err = file.seek_whence(0, 7).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "invalid argument: invalid whence value: 7");
    }

    #[tokio::test]
    async fn test_write_then_read_from_new_handle() {
        let (fs, storage) = setup(false).await;
        let file = fs.create("round.txt").await.unwrap();
        assert_eq!(file.write_str("round trip").await.unwrap(), 10);
        file.sync().await.unwrap();
        file.close().await.unwrap();

        let file = fs.open("round.txt").await.unwrap();
        let mut buf = [0u8; 32];
        let n = file.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"round trip");
        assert_eq!(storage.get("round.txt").await.unwrap().as_ref(), b"round trip");
    }

    #[tokio::test]
    async fn test_partial_overwrite() {
        let (fs, storage) = setup(true).await;
        seed(&storage, "partial.txt", "abcdefg").await;

        let file = fs.open_file("partial.txt", OpenFlags::READ_WRITE).await.unwrap();
        file.write_at(b"ABCD", 2).await.unwrap();
        assert_eq!(storage.get("partial.txt").await.unwrap().as_ref(), b"abABCDg");
        assert_eq!(file.offset().await, 0);
    }

    #[tokio::test]
    async fn test_write_past_end_zero_fills() {
        let (fs, storage) = setup(true).await;
        seed(&storage, "gap.txt", "ab").await;

        let file = fs.open_file("gap.txt", OpenFlags::READ_WRITE).await.unwrap();
        file.write_at(b"cd", 5).await.unwrap();
        assert_eq!(storage.get("gap.txt").await.unwrap().as_ref(), b"ab\0\0\0cd");
    }

    #[tokio::test]
    async fn test_append_ignores_cursor() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "append.txt", "this is original content").await;

        let file = fs
            .open_file("append.txt", OpenFlags::READ_WRITE | OpenFlags::APPEND)
            .await
            .unwrap();
        file.seek(SeekFrom::Start(4)).await.unwrap();
        assert_eq!(file.write(b"data").await.unwrap(), 4);
        assert_eq!(file.offset().await, 4);
        file.sync().await.unwrap();

        assert_eq!(
            storage.get("append.txt").await.unwrap().as_ref(),
            b"this is original contentdata"
        );
        assert!(file.write_at(b"x", 0).await.unwrap_err().is_permission_denied());
    }

    #[tokio::test]
    async fn test_dirty_reads_see_own_writes() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "dirty.txt", "remote").await;

        let file = fs.open_file("dirty.txt", OpenFlags::READ_WRITE).await.unwrap();
        file.write(b"LOCAL!!!").await.unwrap();
        assert!(file.is_dirty().await);

        let mut buf = [0u8; 8];
        assert_eq!(file.read_at(&mut buf, 0).await.unwrap(), 8);
        assert_eq!(&buf, b"LOCAL!!!");
        assert_eq!(file.stat().await.unwrap().size, 8);

        // remote is untouched until sync
        assert_eq!(storage.get("dirty.txt").await.unwrap().as_ref(), b"remote");
        file.sync().await.unwrap();
        assert!(!file.is_dirty().await);
        assert_eq!(storage.get("dirty.txt").await.unwrap().as_ref(), b"LOCAL!!!");
    }

    #[tokio::test]
    async fn test_truncate_resizes() {
        let (fs, storage) = setup(true).await;
        seed(&storage, "trunc.txt", "abcdefg").await;
        let file = fs.open_file("trunc.txt", OpenFlags::READ_WRITE).await.unwrap();
        file.seek(SeekFrom::Start(5)).await.unwrap();

        file.truncate(3).await.unwrap();
        assert_eq!(storage.get("trunc.txt").await.unwrap().as_ref(), b"abc");
        assert_eq!(file.offset().await, 5);

        file.truncate(5).await.unwrap();
        assert_eq!(storage.get("trunc.txt").await.unwrap().as_ref(), b"abc\0\0");

        assert!(matches!(file.truncate(-1).await, Err(FsError::OutOfRange(-1))));
    }

    #[tokio::test]
    async fn test_directory_handle() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "dir/a.txt", "a").await;
        seed(&storage, "dir/b.txt", "bb").await;
        seed(&storage, "dir/sub/c.txt", "ccc").await;

        let dir = fs
            .open_file("dir/", OpenFlags::READ_WRITE)
            .await
            .unwrap();
        assert!(dir.is_dir());

        let mut buf = [0u8; 4];
        assert!(dir.read(&mut buf).await.unwrap_err().is_permission_denied());
        assert!(dir.read_at(&mut buf, 0).await.unwrap_err().is_permission_denied());
        assert!(dir.write(b"x").await.unwrap_err().is_permission_denied());
        assert!(dir.write_at(b"x", 0).await.unwrap_err().is_permission_denied());
        assert!(dir.seek(SeekFrom::Start(0)).await.unwrap_err().is_permission_denied());
        assert!(dir.truncate(0).await.unwrap_err().is_permission_denied());

        assert_eq!(
            dir.readdirnames(0).await.unwrap(),
            vec!["a.txt", "b.txt", "sub"]
        );
        assert_eq!(dir.readdir(2).await.unwrap().len(), 2);
        assert!(!dir.is_dirty().await);
    }

    #[tokio::test]
    async fn test_readdir_on_file_denied() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "plain.txt", "x").await;
        let file = fs.open("plain.txt").await.unwrap();
        assert!(file.readdir(0).await.unwrap_err().is_permission_denied());
    }

    #[tokio::test]
    async fn test_root_directory() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "top.txt", "x").await;
        let root = fs.open("/").await.unwrap();
        assert_eq!(root.name(), "");
        assert!(root.is_dir());
        assert_eq!(root.readdirnames(0).await.unwrap(), vec!["top.txt"]);
    }

    #[tokio::test]
    async fn test_closed_handle() {
        let (fs, storage) = setup(false).await;
        seed(&storage, "closed.txt", "content").await;
        let file = fs.open_file("closed.txt", OpenFlags::READ_WRITE).await.unwrap();
        file.close().await.unwrap();

        let mut buf = [0u8; 4];
        assert!(file.read(&mut buf).await.unwrap_err().is_permission_denied());
        assert!(file.write(b"x").await.unwrap_err().is_permission_denied());
        assert!(file.seek(SeekFrom::Start(0)).await.unwrap_err().is_permission_denied());
        assert!(file.truncate(0).await.unwrap_err().is_permission_denied());
        assert!(file.close().await.unwrap_err().is_permission_denied());
        assert!(matches!(file.stat().await, Err(FsError::AccessDenied(_))));
        assert!(!fs.is_open("closed.txt"));
    }

    #[tokio::test]
    async fn test_close_releases_staged_copy() {
        let staging = Arc::new(crate::staging::MemoryStaging::new());
        let storage = Arc::new(Storage::new(ObjectStoreConfig::Memory).unwrap());
        let fs = BucketFs::builder(storage.clone(), "test-bucket")
            .staging(staging.clone())
            .auto_sync(false)
            .build();

        let file = fs.create("staged.txt").await.unwrap();
        file.write_str("pending").await.unwrap();
        assert_eq!(staging.len(), 1);

        file.close().await.unwrap();
        assert!(staging.is_empty());
        assert_eq!(storage.get("staged.txt").await.unwrap().as_ref(), b"pending");
    }
}
