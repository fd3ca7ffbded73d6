//! File store for processed thumbnails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Raw file primitives the cache and pipeline depend on.
pub trait FileStore: Send + Sync + 'static {
    /// Write `bytes` to `path`, replacing any existing file.
    fn save(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Read the whole file at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Remove the file at `path`.
    fn delete(&self, path: &Path) -> io::Result<()>;
}

/// [`FileStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl FileStore for DiskStore {
    fn save(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// File name for a thumbnail: `{width}_{height}_{sha256(source)}{ext}`.
///
/// The extension is taken from `source` including its dot, or left off if
/// the source has none.
pub fn thumbnail_file_name(width: u32, height: u32, source: &str) -> String {
    let hash = Sha256::digest(source.as_bytes());
    let ext = Path::new(source)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    format!("{width}_{height}_{hash:x}{ext}")
}

/// Full path of a thumbnail inside `cache_dir`.
pub fn thumbnail_path(cache_dir: &Path, width: u32, height: u32, source: &str) -> PathBuf {
    cache_dir.join(thumbnail_file_name(width, height, source))
}
