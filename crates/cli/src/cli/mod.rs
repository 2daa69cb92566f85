use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use bucketfs::store::{mask_s3_url, ObjectStoreConfig};
use bucketfs::{FsConfig, FsError, StagingConfig};

pub mod op;
pub mod ops;

pub use op::{Op, OpContext};
pub use ops::Command;

#[derive(Parser, Debug)]
#[command(name = "bucketfs", version, about = "File operations on object storage buckets")]
pub struct Args {
    /// TOML configuration file
    #[arg(long, global = true, env = "BUCKETFS_CONFIG")]
    pub config: Option<PathBuf>,

    /// S3 bucket as s3://access_key:secret_key@host:port/bucket
    #[arg(long, global = true, env = "BUCKETFS_S3_URL", conflicts_with = "local")]
    pub s3_url: Option<String>,

    /// Use a directory on the local filesystem as the bucket
    #[arg(long, global = true)]
    pub local: Option<PathBuf>,

    /// Stage modified files under this directory instead of in memory
    #[arg(long, global = true)]
    pub staging_dir: Option<PathBuf>,

    /// Only upload modified files when they are closed
    #[arg(long, global = true)]
    pub no_auto_sync: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Resolve the filesystem configuration. Flags override the file.
    pub fn fs_config(&self) -> Result<FsConfig, FsError> {
        let mut config = match &self.config {
            Some(path) => FsConfig::load(path)?,
            None => FsConfig::default(),
        };

        if let Some(url) = &self.s3_url {
            info!(url = %mask_s3_url(url), "using S3 bucket");
            config.store = ObjectStoreConfig::parse_s3_url(url)?;
        } else if let Some(path) = &self.local {
            info!(path = %path.display(), "using local bucket");
            config.store = ObjectStoreConfig::Local { path: path.clone() };
        }

        if config.store == ObjectStoreConfig::Memory {
            return Err(FsError::Config(
                "no bucket configured, pass --s3-url, --local or --config".to_string(),
            ));
        }

        if let Some(dir) = &self.staging_dir {
            config.staging = StagingConfig::Disk {
                path: Some(dir.clone()),
            };
        }
        if self.no_auto_sync {
            config.auto_sync = false;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_a_bucket() {
        let args = Args::parse_from(["bucketfs", "ls"]);
        assert!(matches!(args.fs_config(), Err(FsError::Config(_))));
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "bucketfs",
            "--s3-url",
            "s3://ak:sk@localhost:9000/data",
            "--no-auto-sync",
            "--staging-dir",
            "/tmp/stage",
            "stat",
            "a.txt",
        ]);
        let config = args.fs_config().unwrap();
        assert_eq!(config.store.bucket_name(), "data");
        assert!(!config.auto_sync);
        assert_eq!(
            config.staging,
            StagingConfig::Disk {
                path: Some(PathBuf::from("/tmp/stage"))
            }
        );
    }

    #[test]
    fn test_s3_and_local_conflict() {
        let parsed = Args::try_parse_from([
            "bucketfs",
            "--s3-url",
            "s3://ak:sk@localhost:9000/data",
            "--local",
            "/srv/bucket",
            "ls",
        ]);
        assert!(parsed.is_err());
    }
}
