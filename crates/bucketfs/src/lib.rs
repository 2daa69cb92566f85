//! POSIX-like file handles over whole-object cloud storage buckets
//!
//! Object stores can fetch a whole object or a byte range, and replace or
//! delete a whole object. `bucketfs` builds random-access file semantics on
//! top of that: arbitrary-offset reads and writes, append mode, truncate and
//! bounded seeks.
//!
//! Reads are served as ranged requests against the remote object. The first
//! write to a handle downloads the object into a local staged copy, later
//! writes mutate that copy, and [`File::sync`] (or [`File::close`]) uploads it
//! back as one whole-object replace. With auto-sync enabled every write is
//! uploaded immediately.
//!
//! A [`BucketFs`] keeps at most one live handle per normalized key, so two
//! staged copies never race to overwrite the same object from one process.
//! Across processes the last writer to sync wins.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bucketfs::{BucketFs, OpenFlags};
//! use bucketfs::store::{ObjectStoreConfig, Storage};
//!
//! # async fn example() -> bucketfs::Result<()> {
//! let storage = Storage::new(ObjectStoreConfig::Memory)?;
//! let fs = BucketFs::builder(Arc::new(storage), "scratch")
//!     .auto_sync(false)
//!     .build();
//!
//! let file = fs.create("notes/today.txt").await?;
//! file.write_str("hello world").await?;
//! file.write_at(b"HELLO", 0).await?;
//! file.close().await?;
//!
//! let file = fs.open_file("notes/today.txt", OpenFlags::READ).await?;
//! let mut buf = [0u8; 11];
//! file.read(&mut buf).await?;
//! assert_eq!(&buf, b"HELLO world");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod file;
mod flags;
mod fs;
mod path;
pub mod staging;

pub use config::{FsConfig, StagingConfig};
pub use error::{FsError, Result};
pub use file::{File, SEEK_CURRENT, SEEK_END, SEEK_START};
pub use flags::OpenFlags;
pub use fs::{BucketFs, BucketFsBuilder};
pub use path::{ensure_dir, normalize};

pub use store;
