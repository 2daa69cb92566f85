//! Object storage capability for bucketfs
//!
//! This crate defines the narrow interface the filesystem layer needs from a
//! remote bucket ([`ObjectManager`]) and a default implementation ([`Storage`])
//! backed by the `object_store` crate (S3/MinIO, local filesystem or memory).
//!
//! Object stores have no native directories. A key ending in `/` is a
//! directory key; [`Storage`] persists it as a zero-length marker object named
//! [`DIR_MARKER`] inside that prefix, and treats any non-empty prefix as an
//! implicit directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use bucketfs_store::{ObjectManager, ObjectStoreConfig, Storage};
//!
//! # async fn example() -> Result<(), bucketfs_store::ObjectStoreError> {
//! let storage = Storage::new(ObjectStoreConfig::Memory)?;
//!
//! storage.put("notes/today.txt", "hello world".into()).await?;
//! let head = storage.get_range("notes/today.txt", 0, 5).await?;
//! assert_eq!(head.as_ref(), b"hello");
//!
//! for info in storage.list("notes/", 0).await? {
//!     println!("{} ({} bytes)", info.name(), info.size);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod manager;
mod meta;
mod storage;

pub use config::{mask_s3_url, ObjectStoreConfig};
pub use error::{ObjectStoreError, Result};
pub use manager::ObjectManager;
pub use meta::{is_dir_key, FileInfo, SEPARATOR};
pub use storage::{Storage, DIR_MARKER};
