use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use store::ObjectStoreConfig;

use crate::error::{FsError, Result};
use crate::staging::{DiskStaging, MemoryStaging, Staging};

/// Where staged copies of modified objects live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StagingConfig {
    #[default]
    Memory,
    /// Files under `path`, or a temporary directory when unset
    Disk {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
}

impl StagingConfig {
    pub fn build(&self) -> Result<Arc<dyn Staging>> {
        let staging: Arc<dyn Staging> = match self {
            Self::Memory => Arc::new(MemoryStaging::new()),
            Self::Disk { path: Some(path) } => Arc::new(DiskStaging::new(path)?),
            Self::Disk { path: None } => Arc::new(DiskStaging::temporary()?),
        };
        Ok(staging)
    }
}

/// Filesystem configuration, usually read from a TOML file:
///
/// ```toml
/// auto_sync = false
///
/// [store]
/// type = "s3"
/// endpoint = "http://localhost:9000"
/// access_key = "minioadmin"
/// secret_key = "minioadmin"
/// bucket = "data"
///
/// [staging]
/// type = "disk"
/// path = "/var/tmp/bucketfs"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Upload after every write or truncate
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,

    pub store: ObjectStoreConfig,

    #[serde(default)]
    pub staging: StagingConfig,
}

fn default_auto_sync() -> bool {
    true
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            store: ObjectStoreConfig::Memory,
            auto_sync: default_auto_sync(),
            staging: StagingConfig::default(),
        }
    }
}

impl FsConfig {
    pub fn new(store: ObjectStoreConfig) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FsError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| FsError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FsError::Config(e.to_string()))
    }
}
