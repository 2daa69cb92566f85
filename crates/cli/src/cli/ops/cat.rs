use std::fmt;

use clap::Args;

use bucketfs::{FsError, SEEK_START};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Args, Debug, Clone)]
pub struct Cat {
    /// File to print
    pub path: String,

    /// Start reading at this byte offset
    #[arg(long)]
    pub offset: Option<i64>,

    /// Read at most this many bytes
    #[arg(long)]
    pub length: Option<usize>,
}

#[derive(Debug)]
pub struct CatOutput {
    pub data: Vec<u8>,
}

impl fmt::Display for CatOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.data))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("{0} is a directory")]
    IsDirectory(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Cat {
    type Error = CatError;
    type Output = CatOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let file = ctx.fs.open(&self.path).await?;
        if file.is_dir() {
            file.close().await?;
            return Err(CatError::IsDirectory(file.name().to_string()));
        }
        if let Some(offset) = self.offset {
            file.seek_whence(offset, SEEK_START).await?;
        }

        let limit = self.length.unwrap_or(usize::MAX);
        let mut data = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        while data.len() < limit {
            let want = (limit - data.len()).min(CHUNK_SIZE);
            let n = file.read(&mut chunk[..want]).await?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
        }
        file.close().await?;

        Ok(CatOutput { data })
    }
}
