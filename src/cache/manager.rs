/// Generic in-memory cache with TTL and LRU eviction
///
/// Thread-safe, generic over key/value types. Tracks hit/miss metrics.
/// `insert_if_absent` is the atomic set-if-absent-with-expiry primitive the
/// recompute lock and summary caching build on.

use super::config::CacheConfig;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub inserts: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheInner<K, V> {
    data: HashMap<K, CacheEntry<V>>,
    access_order: VecDeque<K>,
    metrics: CacheMetrics,
}

/// Generic cache manager
pub struct CacheManager<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    config: CacheConfig,
    inner: Arc<RwLock<CacheInner<K, V>>>,
}

impl<K, V> CacheManager<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(CacheInner {
                data: HashMap::new(),
                access_order: VecDeque::new(),
                metrics: CacheMetrics::default(),
            })),
        }
    }

    /// Get value from cache (None if expired or missing)
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.write().unwrap();

        let expired = inner
            .data
            .get(key)
            .map(|entry| entry.is_expired(self.config.ttl));

        match expired {
            None => {
                inner.metrics.misses += 1;
                None
            }
            Some(true) => {
                inner.data.remove(key);
                inner.access_order.retain(|k| k != key);
                inner.metrics.misses += 1;
                inner.metrics.expirations += 1;
                None
            }
            Some(false) => {
                Self::touch(&mut inner, key);
                inner.metrics.hits += 1;
                inner.data.get(key).map(|e| e.value.clone())
            }
        }
    }

    /// Insert value, evicting the LRU entry at capacity
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.write().unwrap();

        if inner.data.len() >= self.config.capacity && !inner.data.contains_key(&key) {
            if let Some(lru_key) = inner.access_order.pop_front() {
                inner.data.remove(&lru_key);
                inner.metrics.evictions += 1;
            }
        }

        inner.data.insert(key.clone(), CacheEntry::new(value));
        Self::touch(&mut inner, &key);
        inner.metrics.inserts += 1;
    }

    /// Atomically insert only when the key is absent or expired.
    /// Returns true when this call installed the value.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut inner = self.inner.write().unwrap();

        let live = inner
            .data
            .get(&key)
            .map(|entry| !entry.is_expired(self.config.ttl))
            .unwrap_or(false);
        if live {
            return false;
        }

        inner.data.insert(key.clone(), CacheEntry::new(value));
        Self::touch(&mut inner, &key);
        inner.metrics.inserts += 1;
        true
    }

    /// Remove specific key
    pub fn remove(&self, key: &K) {
        let mut inner = self.inner.write().unwrap();
        inner.data.remove(key);
        inner.access_order.retain(|k| k != key);
    }

    /// Clear all entries
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.data.clear();
        inner.access_order.clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.read().unwrap().metrics.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn touch(inner: &mut CacheInner<K, V>, key: &K) {
        inner.access_order.retain(|k| k != key);
        inner.access_order.push_back(key.clone());
    }
}
