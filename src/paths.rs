//! Common paths for previewer data
//!
//! - `~/.config/image-previewer/config.toml` - configuration
//! - `<platform cache dir>/image-previewer/` - resized thumbnails

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "image-previewer";

/// Get the config directory (~/.config/image-previewer/)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join(APP_DIR))
}

/// Get the config file path (~/.config/image-previewer/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Default thumbnail directory.
///
/// Falls back to the system temp dir when the platform has no cache dir.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Create the thumbnail directory if it does not exist yet
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create cache directory {}", dir.display()))
}
