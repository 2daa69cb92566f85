use std::fmt;

use clap::Args;
use comfy_table::Table;

use bucketfs::store::FileInfo;
use bucketfs::{ensure_dir, FsError};

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Directory to list (defaults to the bucket root)
    #[arg(default_value = "/")]
    pub path: String,

    /// Maximum number of entries, 0 for all
    #[arg(short = 'n', long, default_value_t = 0)]
    pub limit: usize,
}

#[derive(Debug)]
pub struct LsOutput {
    pub items: Vec<FileInfo>,
}

impl fmt::Display for LsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return write!(f, "No items found");
        }

        let mut table = Table::new();
        table.set_header(vec!["TYPE", "NAME", "SIZE", "MODIFIED"]);
        for item in &self.items {
            let type_str = if item.is_dir { "dir" } else { "file" };
            let modified = if item.is_dir {
                "-".to_string()
            } else {
                item.modified.format("%Y-%m-%d %H:%M:%S").to_string()
            };
            table.add_row(vec![
                type_str.to_string(),
                item.name().to_string(),
                item.size.to_string(),
                modified,
            ]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = LsOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let dir = ctx.fs.open(&ensure_dir(&self.path)).await?;
        let items = dir.readdir(self.limit).await;
        dir.close().await?;

        Ok(LsOutput { items: items? })
    }
}
