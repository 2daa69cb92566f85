use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::{check_key, StagedFile, Staging};

/// Staging area backed by files under a local directory.
///
/// Every key is staged as one flat file directly under the root, with `%` and
/// `/` percent-escaped, so `docs/a.txt` lives at `<root>/docs%2Fa.txt`. Keys
/// like `a` and `a/b` can then be staged side by side.
#[derive(Debug)]
pub struct DiskStaging {
    root: PathBuf,
    // Held so a temporary root is removed on drop
    _temp: Option<TempDir>,
}

impl DiskStaging {
    /// Stage files under an existing or creatable directory.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, _temp: None })
    }

    /// Stage files under a fresh temporary directory, removed on drop.
    pub fn temporary() -> io::Result<Self> {
        let temp = tempfile::Builder::new().prefix("bucketfs-").tempdir()?;
        Ok(Self {
            root: temp.path().to_path_buf(),
            _temp: Some(temp),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(encode_key(key)))
    }
}

fn encode_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' => name.push_str("%25"),
            '/' => name.push_str("%2F"),
            c => name.push(c),
        }
    }
    name
}

#[async_trait]
impl Staging for DiskStaging {
    async fn exists(&self, key: &str) -> io::Result<bool> {
        let path = self.path_for(key)?;
        fs::try_exists(&path).await
    }

    async fn create(&self, key: &str) -> io::Result<Box<dyn StagedFile>> {
        let path = self.path_for(key)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await?;

        tracing::trace!("staged {} at {}", key, path.display());
        Ok(Box::new(DiskFile { file }))
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).await
    }
}

#[derive(Debug)]
struct DiskFile {
    file: File,
}

#[async_trait]
impl StagedFile for DiskFile {
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf).await?;
        self.file.flush().await?;
        Ok(buf.len())
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let saved = self.file.stream_position().await?;
        self.file.seek(SeekFrom::Start(offset)).await?;

        let mut filled = 0;
        let result = loop {
            if filled == buf.len() {
                break Ok(filled);
            }
            match self.file.read(&mut buf[filled..]).await {
                Ok(0) => break Ok(filled),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        };

        self.file.seek(SeekFrom::Start(saved)).await?;
        result
    }

    async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let saved = self.file.stream_position().await?;
        // Seeking past the end and writing leaves a zero-filled hole
        self.file.seek(SeekFrom::Start(offset)).await?;
        let result = self.file.write_all(buf).await;
        self.file.flush().await?;
        self.file.seek(SeekFrom::Start(saved)).await?;
        result.map(|_| buf.len())
    }

    async fn len(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata().await?.len())
    }

    async fn set_len(&mut self, size: u64) -> io::Result<()> {
        self.file.set_len(size).await
    }

    async fn close(self: Box<Self>) -> io::Result<()> {
        let mut file = self.file;
        file.flush().await?;
        file.sync_all().await
    }
}
