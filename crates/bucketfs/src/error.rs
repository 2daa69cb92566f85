use store::ObjectStoreError;
use thiserror::Error;

/// Errors returned by file handles and the filesystem facade.
#[derive(Debug, Error)]
pub enum FsError {
    /// Operation disallowed by the open flags, the handle kind or a closed handle
    #[error("permission denied: {op} on {path:?}")]
    PermissionDenied { op: &'static str, path: String },

    /// Metadata requested from a handle whose state is no longer available
    #[error("access denied: {0:?}")]
    AccessDenied(String),

    #[error("file not found: {0:?}")]
    NotFound(String),

    #[error("file already exists: {0:?}")]
    AlreadyExists(String),

    #[error("offset out of range: {0}")]
    OutOfRange(i64),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("object store error: {0}")]
    Store(#[from] ObjectStoreError),

    #[error("staging error: {0}")]
    Staging(#[from] std::io::Error),

    #[error("bucketfs: method {0} is not implemented")]
    NotImplemented(&'static str),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FsError {
    pub(crate) fn denied(op: &'static str, path: &str) -> Self {
        Self::PermissionDenied {
            op,
            path: path.to_string(),
        }
    }

    /// True for a missing file, whether reported by the facade or the store.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Store(err) => err.is_not_found(),
            _ => false,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
