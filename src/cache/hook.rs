//! Callbacks fired when the cache pushes an entry out.

use std::path::Path;
use std::sync::Arc;

use super::CacheEntry;
use crate::storage::FileStore;

/// Collaborator notified of capacity evictions.
///
/// Runs while the cache lock is held, so implementations must not call back
/// into the cache and should stay short.
pub trait EvictionHook<K, V>: Send + Sync {
    /// Called exactly once for every entry evicted by capacity.
    fn on_evicted(&self, entry: &CacheEntry<K, V>);
}

impl<K, V, F> EvictionHook<K, V> for F
where
    F: Fn(&CacheEntry<K, V>) + Send + Sync,
{
    fn on_evicted(&self, entry: &CacheEntry<K, V>) {
        self(entry);
    }
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl<K, V> EvictionHook<K, V> for NoopHook {
    fn on_evicted(&self, _entry: &CacheEntry<K, V>) {}
}

/// Payloads that may own a file on disk.
pub trait BackingFile {
    /// Path of the owned file, if the payload has one.
    fn backing_file(&self) -> Option<&Path>;
}

/// Deletes the file behind an evicted payload.
///
/// Deletion failures are logged and swallowed; the cache stays consistent
/// whether or not the file actually went away.
pub struct RemoveBackingFile<S> {
    store: Arc<S>,
}

impl<S> RemoveBackingFile<S> {
    /// Create a hook that deletes through `store`.
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<K, V, S> EvictionHook<K, V> for RemoveBackingFile<S>
where
    K: std::fmt::Display,
    V: BackingFile,
    S: FileStore,
{
    fn on_evicted(&self, entry: &CacheEntry<K, V>) {
        let Some(path) = entry.value.backing_file() else {
            return;
        };

        match self.store.delete(path) {
            Ok(()) => tracing::debug!("Evicted {} and removed {}", entry.key, path.display()),
            Err(e) => tracing::error!(
                "Failed to remove evicted file {} for {}: {e}",
                path.display(),
                entry.key
            ),
        }
    }
}
