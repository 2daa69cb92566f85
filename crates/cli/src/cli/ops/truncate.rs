use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use bucketfs::{FsError, OpenFlags};

#[derive(Args, Debug, Clone)]
pub struct Truncate {
    /// File to resize
    pub path: String,

    /// New size in bytes
    pub size: i64,

    /// Create the file if it does not exist
    #[arg(short, long)]
    pub create: bool,
}

#[derive(Debug)]
pub struct TruncateOutput {
    pub path: String,
    pub size: u64,
}

impl fmt::Display for TruncateOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} to {} bytes",
            "Truncated".green().bold(),
            self.path.bold(),
            self.size
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TruncateError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Truncate {
    type Error = TruncateError;
    type Output = TruncateOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut flags = OpenFlags::READ_WRITE;
        if self.create {
            flags |= OpenFlags::CREATE;
        }

        let file = ctx.fs.open_file(&self.path, flags).await?;
        file.truncate(self.size).await?;
        let size = file.stat().await?.size;
        file.close().await?;

        Ok(TruncateOutput {
            path: file.name().to_string(),
            size,
        })
    }
}
