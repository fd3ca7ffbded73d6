//! Configuration module for the previewer

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

/// Log levels accepted by `app.log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Process-wide settings
    #[serde(default)]
    pub app: AppConfig,

    /// Inbound HTTP listener
    #[serde(default)]
    pub http_server: HttpServerConfig,

    /// Thumbnail cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Outbound fetches
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Process-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service name, used in log lines
    #[serde(default = "default_name")]
    pub name: String,

    /// Minimum log level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Inbound HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// IP address to bind
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port to bind
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

/// Thumbnail cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory thumbnails are written to
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Maximum number of cached thumbnails
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Outbound fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Time budget for fetching one source image
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_name() -> String {
    "image-previewer".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

const fn default_listen_port() -> u16 {
    8081
}

fn default_cache_dir() -> PathBuf {
    paths::default_cache_dir()
}

const fn default_capacity() -> usize {
    100
}

const fn default_timeout_secs() -> u64 {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            capacity: default_capacity(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpServerConfig {
    /// Socket address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.listen_addr))?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }
}

impl FetchConfig {
    /// Fetch budget as a duration.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = paths::config_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("APP_LOG_LEVEL") {
            self.app.log_level = v;
        }
        if let Some(v) = lookup("HTTP_SERVER_LISTEN_ADDR") {
            self.http_server.listen_addr = v;
        }
        if let Some(v) = lookup("HTTP_SERVER_LISTEN_PORT") {
            self.http_server.listen_port = v
                .parse()
                .with_context(|| format!("Invalid HTTP_SERVER_LISTEN_PORT: {v}"))?;
        }
        if let Some(v) = lookup("CACHE_DIR") {
            self.cache.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CACHE_CAPACITY") {
            self.cache.capacity = v
                .parse()
                .with_context(|| format!("Invalid CACHE_CAPACITY: {v}"))?;
        }
        if let Some(v) = lookup("FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = v
                .parse()
                .with_context(|| format!("Invalid FETCH_TIMEOUT_SECS: {v}"))?;
        }
        Ok(())
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.app.name.trim().is_empty() {
            bail!("app.name must not be empty");
        }
        if !LOG_LEVELS.contains(&self.app.log_level.as_str()) {
            bail!(
                "app.log_level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.app.log_level
            );
        }
        self.http_server.socket_addr()?;
        if self.cache.capacity == 0 {
            bail!("cache.capacity must be at least 1");
        }
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(5));
        assert_eq!(config.http_server.socket_addr().unwrap().port(), 8081);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.app.log_level, "info");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[app]
log_level = "debug"
log_format = "json"

[cache]
dir = "/tmp/previews"
capacity = 3
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.app.log_level, "debug");
        assert_eq!(config.app.log_format, LogFormat::Json);
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/previews"));
        assert_eq!(config.cache.capacity, 3);
        assert_eq!(config.http_server.listen_port, 8081);
        assert_eq!(config.fetch.timeout_secs, 5);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CACHE_CAPACITY", "7"),
            ("CACHE_DIR", "/var/cache/previews"),
            ("HTTP_SERVER_LISTEN_PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|name| vars.get(name).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.cache.capacity, 7);
        assert_eq!(config.cache.dir, PathBuf::from("/var/cache/previews"));
        assert_eq!(config.http_server.listen_port, 9000);
    }

    #[test]
    fn test_bad_env_value_is_error() {
        let mut config = Config::default();
        let result = config.apply_overrides(|name| {
            (name == "CACHE_CAPACITY").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.app.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.http_server.listen_addr = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::parse(&text).unwrap();
        assert_eq!(parsed.cache.dir, config.cache.dir);
    }
}
