use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use bucketfs::{normalize, FsError};

#[derive(Args, Debug, Clone)]
pub struct Mv {
    /// Existing file
    pub from: String,

    /// New location
    pub to: String,
}

#[derive(Debug)]
pub struct MvOutput {
    pub from: String,
    pub to: String,
}

impl fmt::Display for MvOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            "Moved".green().bold(),
            self.from,
            self.to.bold()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MvError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("{0} is open, close it before moving")]
    Busy(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mv {
    type Error = MvError;
    type Output = MvOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let from = normalize(&self.from);
        if ctx.fs.is_open(&from) {
            return Err(MvError::Busy(from));
        }
        ctx.fs.rename(&self.from, &self.to).await?;

        Ok(MvOutput {
            from,
            to: normalize(&self.to),
        })
    }
}
