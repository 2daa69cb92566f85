use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use bucketfs::FsError;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// File or directory to remove
    pub path: String,

    /// Remove everything under the path
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Debug)]
pub struct RmOutput {
    pub path: String,
    pub recursive: bool,
}

impl fmt::Display for RmOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "Removed".green().bold(), self.path.bold())?;
        if self.recursive {
            write!(f, " {}", "(recursive)".dimmed())?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rm {
    type Error = RmError;
    type Output = RmOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        if self.recursive {
            ctx.fs.remove_all(&self.path).await?;
        } else {
            ctx.fs.remove(&self.path).await?;
        }

        Ok(RmOutput {
            path: bucketfs::normalize(&self.path),
            recursive: self.recursive,
        })
    }
}
