//! Fetch → resize → persist → register.
//!
//! [`Previewer`] answers a [`FillRequest`] from the LRU index when it can and
//! otherwise runs the full pipeline, registering the new thumbnail before
//! returning it. Concurrent misses for the same key are not coalesced: each
//! runs the pipeline and the last `set` wins.
//!
//! A client that disconnects while the thumbnail is being saved drops
//! [`Previewer::fill`] before the entry is registered. The file stays on disk
//! unindexed until the next request for the same key overwrites it.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;

use crate::cache::{CacheKey, ImageItem, LruCache, RemoveBackingFile};
use crate::config::Config;
use crate::fetch::{FetchError, Fetcher, Forwarded, ProxyClient};
use crate::storage::{self, DiskStore, FileStore};
use crate::transform::{FillTransformer, TransformError, Transformer};

/// The only source extension accepted.
pub const ACCEPTED_EXTENSION: &str = "jpg";

/// Rejected request parameters.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Width is not a positive integer
    #[error("Invalid width value: {0}")]
    Width(String),

    /// Height is not a positive integer
    #[error("Invalid height value: {0}")]
    Height(String),

    /// Source does not end in the accepted extension
    #[error("Invalid file extension. JPG supported only")]
    Extension,
}

/// Failure of a pipeline stage. Every variant ends the request.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Could not download the source
    #[error("Failed to fetch image: {0}")]
    Fetch(#[from] FetchError),

    /// Could not decode or resize the source
    #[error("Failed to modify image: {0}")]
    Transform(#[from] TransformError),

    /// Could not write the thumbnail
    #[error("Failed to save image {}: {source}", .path.display())]
    Persist {
        /// Target path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A cached thumbnail could not be read back
    #[error("Failed to read file from cache {}: {source}", .path.display())]
    ReadCached {
        /// Cached path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A blocking worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] JoinError),
}

/// A validated thumbnail request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillRequest {
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Source URL or `host/path`
    pub source: String,
}

impl FillRequest {
    /// Validate raw path parameters.
    pub fn parse(width: &str, height: &str, source: &str) -> Result<Self, ValidationError> {
        let width =
            parse_dimension(width).ok_or_else(|| ValidationError::Width(width.to_string()))?;
        let height =
            parse_dimension(height).ok_or_else(|| ValidationError::Height(height.to_string()))?;

        let ext = Path::new(source).extension().and_then(|e| e.to_str());
        if ext != Some(ACCEPTED_EXTENSION) {
            return Err(ValidationError::Extension);
        }

        Ok(Self {
            width,
            height,
            source: source.to_string(),
        })
    }

    /// Cache fingerprint of this request.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.width, self.height, &self.source)
    }
}

fn parse_dimension(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|v| *v >= 1)
}

/// A thumbnail ready to be served.
#[derive(Debug, Clone)]
pub struct Preview {
    /// Encoded JPEG bytes
    pub bytes: Vec<u8>,
    /// Whether the bytes came from the cache
    pub cache_hit: bool,
}

/// Thumbnail pipeline plus its LRU index.
pub struct Previewer<F, T = FillTransformer, S = DiskStore> {
    cache: LruCache<CacheKey, ImageItem>,
    fetcher: F,
    transformer: Arc<T>,
    store: Arc<S>,
    cache_dir: PathBuf,
    fetch_timeout: Duration,
}

impl Previewer<ProxyClient> {
    /// Build the production pipeline from configuration.
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.fetch.timeout();
        Self::new(
            config,
            ProxyClient::new(timeout),
            FillTransformer,
            DiskStore,
        )
    }
}

impl<F, T, S> Previewer<F, T, S>
where
    F: Fetcher,
    T: Transformer,
    S: FileStore,
{
    /// Build a pipeline from explicit collaborators.
    pub fn new(config: &Config, fetcher: F, transformer: T, store: S) -> Self {
        let store = Arc::new(store);
        let cache = LruCache::with_hook(
            config.cache.capacity,
            RemoveBackingFile::new(Arc::clone(&store)),
        );

        Self {
            cache,
            fetcher,
            transformer: Arc::new(transformer),
            store,
            cache_dir: config.cache.dir.clone(),
            fetch_timeout: config.fetch.timeout(),
        }
    }

    /// The LRU index of processed thumbnails.
    pub const fn cache(&self) -> &LruCache<CacheKey, ImageItem> {
        &self.cache
    }

    /// Directory thumbnails are written to.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Serve a thumbnail, producing and caching it on a miss.
    pub async fn fill(
        &self,
        request: &FillRequest,
        forwarded: &Forwarded,
    ) -> Result<Preview, PipelineError> {
        let key = request.key();

        if let Some(item) = self.cache.get(&key) {
            tracing::debug!("Hit to cache: {key}");
            let bytes = self.read_cached(item.file_path).await?;
            return Ok(Preview {
                bytes,
                cache_hit: true,
            });
        }

        tracing::debug!("Miss in cache: {key}");

        let source = tokio::time::timeout(
            self.fetch_timeout,
            self.fetcher.fetch(&request.source, forwarded),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        let bytes = self.resize(source, request.width, request.height).await?;

        let path = storage::thumbnail_path(
            &self.cache_dir,
            request.width,
            request.height,
            &request.source,
        );
        let bytes = self.persist(path.clone(), bytes).await?;

        self.cache.set(
            key,
            ImageItem {
                file_path: path,
                width: request.width,
                height: request.height,
                original_url: request.source.clone(),
            },
        );

        Ok(Preview {
            bytes,
            cache_hit: false,
        })
    }

    async fn read_cached(&self, path: PathBuf) -> Result<Vec<u8>, PipelineError> {
        let store = Arc::clone(&self.store);
        let (path, result) = tokio::task::spawn_blocking(move || {
            let result = store.read(&path);
            (path, result)
        })
        .await?;

        result.map_err(|source| PipelineError::ReadCached { path, source })
    }

    async fn resize(
        &self,
        source: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, PipelineError> {
        let transformer = Arc::clone(&self.transformer);
        let bytes =
            tokio::task::spawn_blocking(move || transformer.transform(&source, width, height))
                .await??;
        Ok(bytes)
    }

    async fn persist(&self, path: PathBuf, bytes: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let store = Arc::clone(&self.store);
        let (path, result) = tokio::task::spawn_blocking(move || {
            let result = store.save(&path, &bytes).map(|()| bytes);
            (path, result)
        })
        .await?;

        result.map_err(|source| PipelineError::Persist { path, source })
    }
}
