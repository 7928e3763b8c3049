//! Bounded TTL cache for directory entities.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Cache entry with value and expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Configuration for the directory cache.
#[derive(
    Debug, Clone, Serialize, Deserialize, Getters, derive_setters::Setters, derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct DirectoryCacheConfig {
    /// Lifetime of cached entries (seconds)
    #[serde(default = "default_ttl")]
    ttl_seconds: u64,

    /// Maximum number of entries per entity kind
    #[serde(default = "default_max_entries")]
    max_entries: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_ttl() -> u64 {
    300 // 5 minutes
}

fn default_max_entries() -> usize {
    10_000
}

fn default_enabled() -> bool {
    true
}

impl Default for DirectoryCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_entries: default_max_entries(),
            enabled: default_enabled(),
        }
    }
}

/// LRU-bounded map with per-entry expiry.
///
/// # Example
///
/// ```
/// use coevoice_core::{DirectoryCacheConfig, EntityCache};
///
/// let mut cache: EntityCache<String, u32> = EntityCache::new(&DirectoryCacheConfig::default());
/// cache.insert("answer".to_string(), 42);
/// assert_eq!(cache.get(&"answer".to_string()), Some(42));
/// ```
#[derive(Debug)]
pub struct EntityCache<K, V> {
    ttl: Duration,
    max_entries: usize,
    enabled: bool,
    entries: HashMap<K, CacheEntry<V>>,
    access_order: VecDeque<K>,
}

impl<K, V> EntityCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache from configuration.
    pub fn new(config: &DirectoryCacheConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_seconds),
            max_entries: config.max_entries.max(1),
            enabled: config.enabled,
            entries: HashMap::new(),
            access_order: VecDeque::new(),
        }
    }

    /// Fresh value for `key`, dropping it if expired.
    pub fn get(&mut self, key: &K) -> Option<V> {
        if !self.enabled {
            return None;
        }

        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.remove(key);
            return None;
        }

        self.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or replace a value, evicting the least recently used entry at capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if !self.enabled {
            return;
        }

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.evict_lru();
        }

        self.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl: self.ttl,
            },
        );
        self.touch(&key);
    }

    /// Edit a fresh entry in place. Its expiry is not extended.
    pub fn update(&mut self, key: &K, edit: impl FnOnce(&mut V)) -> bool {
        if !self.enabled {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                edit(&mut entry.value);
                true
            }
            _ => false,
        }
    }

    /// Drop a single entry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Drop every entry matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        self.entries.retain(|k, entry| keep(k, &entry.value));
        let entries = &self.entries;
        self.access_order.retain(|k| entries.contains_key(k));
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(key.clone());
    }

    fn evict_lru(&mut self) {
        if let Some(oldest) = self.access_order.pop_front() {
            self.entries.remove(&oldest);
            tracing::trace!(cache_size = self.entries.len(), "Evicted least recently used entry");
        }
    }
}
