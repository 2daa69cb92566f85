use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use bucketfs::store::FileInfo;
use bucketfs::FsError;

#[derive(Args, Debug, Clone)]
pub struct Stat {
    /// File or directory (trailing `/`) to describe
    pub path: String,
}

#[derive(Debug)]
pub struct StatOutput {
    pub bucket: String,
    pub info: FileInfo,
}

impl fmt::Display for StatOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.info.is_dir { "directory" } else { "file" };
        writeln!(f, "{} {}", self.info.key.bold(), format!("({kind})").dimmed())?;
        writeln!(f, "  {} {}", "bucket:".dimmed(), self.bucket)?;
        writeln!(f, "  {} {}", "size:".dimmed(), self.info.size)?;
        write!(
            f,
            "  {} {}",
            "modified:".dimmed(),
            self.info.modified.to_rfc3339()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Stat {
    type Error = StatError;
    type Output = StatOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let info = ctx.fs.stat(&self.path).await?;
        Ok(StatOutput {
            bucket: ctx.fs.bucket().to_string(),
            info,
        })
    }
}
