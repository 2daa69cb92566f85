use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;
use tokio::io::AsyncReadExt;

use bucketfs::{FsError, OpenFlags};

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Destination file in the bucket
    pub path: String,

    /// Content to write (reads --file or stdin when omitted)
    pub content: Option<String>,

    /// Read the content from a local file
    #[arg(long, conflicts_with = "content")]
    pub file: Option<PathBuf>,

    /// Append to the end of the existing object
    #[arg(long)]
    pub append: bool,

    /// Overwrite in place starting at this byte offset
    #[arg(long, conflicts_with = "append")]
    pub offset: Option<i64>,
}

#[derive(Debug)]
pub struct PutOutput {
    pub path: String,
    pub bytes: usize,
    pub size: u64,
}

impl fmt::Display for PutOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} bytes to {}",
            "Wrote".green().bold(),
            self.bytes,
            self.path.bold()
        )?;
        write!(f, "  {} {}", "size:".dimmed(), self.size)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

impl Put {
    async fn content(&self) -> Result<Vec<u8>, std::io::Error> {
        if let Some(content) = &self.content {
            return Ok(content.clone().into_bytes());
        }
        if let Some(path) = &self.file {
            return tokio::fs::read(path).await;
        }
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        Ok(buf)
    }

    fn flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::READ_WRITE | OpenFlags::CREATE;
        if self.append {
            flags |= OpenFlags::APPEND;
        } else if self.offset.is_none() {
            flags |= OpenFlags::TRUNCATE;
        }
        flags
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Put {
    type Error = PutError;
    type Output = PutOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let content = self.content().await?;

        let file = ctx.fs.open_file(&self.path, self.flags()).await?;
        let bytes = match self.offset {
            Some(offset) => file.write_at(&content, offset).await?,
            None => file.write(&content).await?,
        };
        let size = file.stat().await?.size;
        file.close().await?;

        Ok(PutOutput {
            path: file.name().to_string(),
            bytes,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        put: Put,
    }

    fn parse(args: &[&str]) -> Put {
        let mut argv = vec!["put"];
        argv.extend_from_slice(args);
        Wrapper::parse_from(argv).put
    }

    #[test]
    fn test_flags() {
        let replace = parse(&["a.txt", "hello"]).flags();
        assert!(replace.contains(OpenFlags::TRUNCATE));
        assert!(!replace.contains(OpenFlags::APPEND));

        let append = parse(&["a.txt", "hello", "--append"]).flags();
        assert!(append.append_only());
        assert!(!append.contains(OpenFlags::TRUNCATE));

        let positioned = parse(&["a.txt", "hello", "--offset", "3"]).flags();
        assert!(!positioned.contains(OpenFlags::TRUNCATE));
        assert!(!positioned.contains(OpenFlags::APPEND));
    }

    #[test]
    fn test_append_conflicts_with_offset() {
        let parsed = Wrapper::try_parse_from(["put", "a.txt", "x", "--append", "--offset", "1"]);
        assert!(parsed.is_err());
    }
}
