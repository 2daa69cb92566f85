//! Minimal object metadata shared by the store and the filesystem layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key separator used by every object manager.
pub const SEPARATOR: char = '/';

/// Whether `key` names a directory.
///
/// The empty key is the bucket root; any key ending in the separator is a
/// directory prefix.
pub fn is_dir_key(key: &str) -> bool {
    key.is_empty() || key.ends_with(SEPARATOR)
}

/// Metadata for an object or directory prefix in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Full object key (directories end with `/`)
    pub key: String,
    /// Size in bytes (always 0 for directories)
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Is this a directory?
    pub is_dir: bool,
}

impl FileInfo {
    /// Create metadata for `key`; the directory flag follows the key shape.
    pub fn new(key: impl Into<String>, size: u64, modified: DateTime<Utc>) -> Self {
        let key = key.into();
        let is_dir = is_dir_key(&key);
        Self {
            key,
            size: if is_dir { 0 } else { size },
            modified,
            is_dir,
        }
    }

    /// Last path segment of the key, without the trailing separator.
    pub fn name(&self) -> &str {
        let trimmed = self.key.trim_end_matches(SEPARATOR);
        match trimmed.rfind(SEPARATOR) {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dir_key() {
        assert!(is_dir_key(""));
        assert!(is_dir_key("a/"));
        assert!(is_dir_key("a/b/"));
        assert!(!is_dir_key("a"));
        assert!(!is_dir_key("a/b.txt"));
    }

    #[test]
    fn test_file_info_name() {
        let now = Utc::now();
        assert_eq!(FileInfo::new("path/to/file.txt", 3, now).name(), "file.txt");
        assert_eq!(FileInfo::new("path/to/dir/", 0, now).name(), "dir");
        assert_eq!(FileInfo::new("top.txt", 1, now).name(), "top.txt");
    }

    #[test]
    fn test_directory_info_has_no_size() {
        let info = FileInfo::new("path/to/dir/", 42, Utc::now());
        assert!(info.is_dir);
        assert_eq!(info.size, 0);
    }
}
