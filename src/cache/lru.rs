//! Fixed-capacity LRU cache with an eviction hook.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

use super::list::{List, NodeId};
use super::{CacheEntry, EvictionHook};

struct Inner<K, V> {
    queue: List<CacheEntry<K, V>>,
    items: HashMap<K, NodeId>,
}

/// Thread-safe LRU cache bounded by entry count.
///
/// Every method holds one mutex for its whole duration, so operations are
/// linearizable. When an insert pushes the length past capacity the back
/// entry is evicted and handed to the hook before `set` returns.
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
    on_evicted: Option<Box<dyn EvictionHook<K, V>>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache with no eviction hook.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be greater than 0");

        Self {
            inner: Mutex::new(Inner {
                queue: List::with_capacity(capacity + 1),
                items: HashMap::with_capacity(capacity + 1),
            }),
            capacity,
            on_evicted: None,
        }
    }

    /// Create a cache that notifies `hook` of every capacity eviction.
    #[must_use]
    pub fn with_hook(capacity: usize, hook: impl EvictionHook<K, V> + 'static) -> Self {
        Self {
            on_evicted: Some(Box::new(hook)),
            ..Self::new(capacity)
        }
    }

    /// Insert or replace a value. Returns `true` if the key was already present.
    pub fn set(&self, key: K, value: V) -> bool {
        let mut inner = self.lock();

        if let Some(&id) = inner.items.get(&key) {
            if let Some(entry) = inner.queue.get_mut(id) {
                entry.value = value;
            }
            inner.queue.move_to_front(id);
            return true;
        }

        let id = inner.queue.push_front(CacheEntry {
            key: key.clone(),
            value,
        });
        inner.items.insert(key, id);

        if inner.queue.len() > self.capacity
            && let Some(evicted) = inner.queue.pop_back()
        {
            inner.items.remove(&evicted.key);
            if let Some(hook) = &self.on_evicted {
                hook.on_evicted(&evicted);
            }
        }

        false
    }

    /// Look up a value and mark it as most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();

        let id = *inner.items.get(key)?;
        inner.queue.move_to_front(id);
        inner.queue.get(id).map(|entry| entry.value.clone())
    }

    /// Check for a key without refreshing its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().items.contains_key(key)
    }

    /// Drop every entry. The eviction hook is *not* called.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.queue.clear();
        inner.items.clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys ordered from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.lock().queue.iter().map(|e| e.key.clone()).collect()
    }

    // No method panics between mutations, so a poisoned lock still guards
    // a consistent list/map pair.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
