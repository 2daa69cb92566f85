use std::collections::HashMap;
use std::io::{self, SeekFrom};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{check_key, StagedFile, Staging};

type Buffer = Arc<Mutex<Vec<u8>>>;

/// In-memory staging area
#[derive(Debug, Default)]
pub struct MemoryStaging {
    entries: Mutex<HashMap<String, Buffer>>,
}

impl MemoryStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl Staging for MemoryStaging {
    async fn exists(&self, key: &str) -> io::Result<bool> {
        Ok(self.entries.lock().contains_key(key))
    }

    async fn create(&self, key: &str) -> io::Result<Box<dyn StagedFile>> {
        check_key(key)?;
        let data: Buffer = Arc::default();
        self.entries.lock().insert(key.to_string(), data.clone());
        Ok(Box::new(MemoryFile { data, pos: 0 }))
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        match self.entries.lock().remove(key) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no staged entry for {key:?}"),
            )),
        }
    }
}

#[derive(Debug)]
struct MemoryFile {
    data: Buffer,
    pos: u64,
}

impl MemoryFile {
    fn read_into(data: &[u8], buf: &mut [u8], offset: u64) -> usize {
        let start = (offset as usize).min(data.len());
        let end = (start + buf.len()).min(data.len());
        let n = end - start;
        buf[..n].copy_from_slice(&data[start..end]);
        n
    }

    fn write_into(data: &mut Vec<u8>, buf: &[u8], offset: u64) -> io::Result<usize> {
        let start = usize::try_from(offset).map_err(|_| too_large(offset))?;
        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| too_large(offset))?;
        Self::grow(data, end)?;
        data[start..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    /// Zero-extend `data` to at least `len` bytes without aborting on
    /// allocation failure.
    fn grow(data: &mut Vec<u8>, len: usize) -> io::Result<()> {
        if data.len() < len {
            data.try_reserve(len - data.len())
                .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
            data.resize(len, 0);
        }
        Ok(())
    }
}

fn too_large(size: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("staged size out of range: {size}"),
    )
}

#[async_trait]
impl StagedFile for MemoryFile {
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.data.lock().len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
            SeekFrom::End(delta) => len + delta,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = Self::read_into(&self.data.lock(), buf, self.pos);
        self.pos += n as u64;
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = Self::write_into(&mut self.data.lock(), buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Ok(Self::read_into(&self.data.lock(), buf, offset))
    }

    async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        Self::write_into(&mut self.data.lock(), buf, offset)
    }

    async fn len(&mut self) -> io::Result<u64> {
        Ok(self.data.lock().len() as u64)
    }

    async fn set_len(&mut self, size: u64) -> io::Result<()> {
        let size_usize = usize::try_from(size).map_err(|_| too_large(size))?;
        let mut data = self.data.lock();
        if size_usize <= data.len() {
            data.truncate(size_usize);
            return Ok(());
        }
        Self::grow(&mut data, size_usize)
    }

    async fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}
