use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use bucketfs::{ensure_dir, FsError};

#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// Directory to create
    pub path: String,

    /// Do not fail if the directory already exists
    #[arg(short, long)]
    pub parents: bool,
}

#[derive(Debug)]
pub struct MkdirOutput {
    pub path: String,
}

impl fmt::Display for MkdirOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "Created".green().bold(), self.path.bold())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = MkdirOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        if self.parents {
            ctx.fs.mkdir_all(&self.path).await?;
        } else {
            ctx.fs.mkdir(&self.path).await?;
        }

        Ok(MkdirOutput {
            path: ensure_dir(&self.path),
        })
    }
}
