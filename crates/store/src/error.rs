use thiserror::Error;

/// Errors surfaced by an object manager.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error("object storage error: {0}")]
    Backend(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectStoreError {
    /// Map a backend error for `key`, keeping not-found and permission
    /// failures distinguishable from transport errors.
    pub(crate) fn from_backend(key: &str, err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => Self::NotFound(key.to_string()),
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => {
                Self::PermissionDenied(key.to_string())
            }
            other => Self::Backend(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ObjectStoreError>;
