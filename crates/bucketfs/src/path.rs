//! Bucket key normalization.
//!
//! Filesystem paths are turned into object keys: no leading separator, no
//! empty segments, and a single trailing separator when the caller asked
//! for a directory.

use store::SEPARATOR;

pub use store::is_dir_key;

/// Normalize a filesystem path into a bucket key.
pub fn normalize(path: &str) -> String {
    let wants_dir = path.ends_with(SEPARATOR);
    let mut key = path
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if wants_dir && !key.is_empty() {
        key.push(SEPARATOR);
    }
    key
}

/// Normalize `path` and force it into a directory key.
pub fn ensure_dir(path: &str) -> String {
    let mut key = normalize(path);
    if !is_dir_key(&key) {
        key.push(SEPARATOR);
    }
    key
}
