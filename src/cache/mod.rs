//! Bounded LRU index of processed images.
//!
//! The cache only tracks *where* a thumbnail lives on disk. The bytes stay
//! in files under the cache directory, and evicting an entry removes its file
//! through the [`EvictionHook`] the cache was built with.

mod hook;
pub mod list;
mod lru;

pub use hook::{BackingFile, EvictionHook, NoopHook, RemoveBackingFile};
pub use lru::LruCache;

use std::fmt;
use std::path::{Path, PathBuf};

/// Fingerprint of a thumbnail request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a `(width, height, source)` triple.
    pub fn new(width: u32, height: u32, source: &str) -> Self {
        Self(format!("{width}_{height}_{source}"))
    }

    /// The key as a string slice.
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Key/value pair stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<K, V> {
    /// Lookup key
    pub key: K,
    /// Stored payload
    pub value: V,
}

/// A processed thumbnail on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageItem {
    /// Where the resized file was written
    pub file_path: PathBuf,
    /// Target width
    pub width: u32,
    /// Target height
    pub height: u32,
    /// Source the thumbnail was made from
    pub original_url: String,
}

impl BackingFile for ImageItem {
    fn backing_file(&self) -> Option<&Path> {
        Some(&self.file_path)
    }
}
