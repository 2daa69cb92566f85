use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ObjectStoreError, Result};

/// Region used when an S3 configuration does not name one.
const DEFAULT_REGION: &str = "us-east-1";

/// Backend selection for [`Storage`](crate::Storage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectStoreConfig {
    /// Ephemeral in-memory bucket, lost on drop
    Memory,
    /// Objects stored as files under `path`
    Local { path: PathBuf },
    /// S3-compatible bucket (AWS, MinIO, OSS S3 gateway, ...)
    S3 {
        endpoint: String,
        access_key: String,
        secret_key: String,
        bucket: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
    },
}

impl ObjectStoreConfig {
    /// Parse an `s3://access_key:secret_key@host[:port]/bucket` URL.
    ///
    /// A `region` query parameter selects the region and `tls=true` switches
    /// the endpoint to https.
    pub fn parse_s3_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| ObjectStoreError::Config(e.to_string()))?;

        if parsed.scheme() != "s3" {
            return Err(ObjectStoreError::Config(format!(
                "expected s3:// scheme, got {}://",
                parsed.scheme()
            )));
        }

        let access_key = parsed.username().to_string();
        if access_key.is_empty() {
            return Err(ObjectStoreError::Config(
                "missing access key in S3 URL".to_string(),
            ));
        }
        let secret_key = parsed
            .password()
            .ok_or_else(|| ObjectStoreError::Config("missing secret key in S3 URL".to_string()))?
            .to_string();

        let host = parsed
            .host_str()
            .ok_or_else(|| ObjectStoreError::Config("missing host in S3 URL".to_string()))?;

        let bucket = parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| ObjectStoreError::Config("missing bucket in S3 URL".to_string()))?
            .to_string();

        let mut region = None;
        let mut tls = false;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "region" => region = Some(value.into_owned()),
                "tls" => tls = value == "true",
                _ => {}
            }
        }

        let scheme = if tls { "https" } else { "http" };
        let endpoint = match parsed.port() {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        };

        Ok(Self::S3 {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
        })
    }

    /// Name identifying the bucket this configuration points at.
    pub fn bucket_name(&self) -> String {
        match self {
            Self::Memory => "memory".to_string(),
            Self::Local { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::S3 { bucket, .. } => bucket.clone(),
        }
    }

    pub(crate) fn region_or_default(region: &Option<String>) -> &str {
        region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

/// Hide the credentials of an `s3://` URL for display.
pub fn mask_s3_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("s3://") {
        if let Some(at_pos) = rest.find('@') {
            let host_bucket = &rest[at_pos..];
            return format!("s3://***:***{}", host_bucket);
        }
    }
    url.to_string()
}
