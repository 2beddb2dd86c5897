//! Payload cache with LRU eviction
//!
//! Keeps fetched container bytes keyed by resolved URL so re-equipping an item
//! skips the transport.

use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Bytes,
    last_accessed: std::time::Instant,
    access_count: u64,
}

/// Cache performance statistics
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes: usize,
}

impl CacheStats {
    /// Hit ratio as a percentage
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    current_size: usize,
    stats: CacheStats,
}

#[derive(Debug)]
pub struct PayloadCache {
    inner: RwLock<CacheInner>,
    max_size: usize,
}

impl PayloadCache {
    pub fn new(max_size_mb: usize) -> Self {
        info!("🗄️ Payload cache capacity {} MB", max_size_mb);
        Self {
            inner: RwLock::new(CacheInner::default()),
            max_size: max_size_mb * 1024 * 1024,
        }
    }

    /// Cache with an explicit byte budget
    pub fn with_byte_limit(max_size: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            max_size,
        }
    }

    pub async fn get(&self, url: &str) -> Option<Bytes> {
        let mut inner = self.inner.write().await;
        let hit = match inner.entries.get_mut(url) {
            Some(entry) => {
                entry.last_accessed = std::time::Instant::now();
                entry.access_count += 1;
                Some(entry.data.clone())
            }
            None => None,
        };
        if hit.is_some() {
            inner.stats.hits += 1;
            debug!("📋 Cache HIT {}", url);
        } else {
            inner.stats.misses += 1;
            debug!("📋 Cache MISS {}", url);
        }
        hit
    }

    pub async fn put(&self, url: &str, data: Bytes) {
        let size = data.len();
        if size > self.max_size {
            debug!("📋 {} ({} bytes) exceeds cache capacity, not cached", url, size);
            return;
        }

        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(url) {
            return;
        }

        // Evict least recently used, then least used, until the payload fits
        while inner.current_size + size > self.max_size {
            let victim = inner
                .entries
                .iter()
                .min_by(|(_, a), (_, b)| {
                    a.last_accessed
                        .cmp(&b.last_accessed)
                        .then_with(|| a.access_count.cmp(&b.access_count))
                })
                .map(|(key, _)| key.clone());
            let Some(victim) = victim else { break };
            if let Some(entry) = inner.entries.remove(&victim) {
                inner.current_size -= entry.data.len();
                inner.stats.evictions += 1;
                debug!("📋 Evicted {} ({} bytes)", victim, entry.data.len());
            }
        }

        inner.entries.insert(
            url.to_string(),
            CacheEntry {
                data,
                last_accessed: std::time::Instant::now(),
                access_count: 1,
            },
        );
        inner.current_size += size;
    }

    pub async fn remove(&self, url: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.entries.remove(url) {
            Some(entry) => {
                inner.current_size -= entry.data.len();
                true
            }
            None => false,
        }
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.entries.len();
        inner.entries.clear();
        inner.current_size = 0;
        info!("📋 Cleared {} payloads from cache", count);
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.entries = inner.entries.len();
        stats.bytes = inner.current_size;
        stats
    }
}

impl Default for PayloadCache {
    fn default() -> Self {
        Self::new(64)
    }
}
