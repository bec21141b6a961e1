//! Cost-weighted LRU cache for composited variants

use log::{debug, trace};
use lru::LruCache;

use crate::config::CacheConfig;
use crate::registry::SpriteItem;

/// What the cache stores: a composited single frame or animation.
pub type CacheEntry = SpriteItem;

/// Hit/miss/eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub total_cost: usize,
}

/// LRU bounded both by entry count and by total cost.
///
/// The cost of an entry is its frame count, so a long animation weighs as much
/// as that many static sprites.
#[derive(Debug)]
pub struct VariantCache {
    entries: LruCache<String, CacheEntry>,
    enabled: bool,
    max_entries: usize,
    max_cost: usize,
    total_cost: usize,
    stats: CacheStats,
}

impl VariantCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: LruCache::unbounded(),
            enabled: config.enabled,
            max_entries: config.max_entries,
            max_cost: config.max_cost,
            total_cost: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn cost_of(entry: &CacheEntry) -> usize {
        entry.frame_count().max(1)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        if !self.enabled {
            return None;
        }
        match self.entries.get(key) {
            Some(entry) => {
                self.stats.hits += 1;
                Some(entry)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.enabled && self.entries.contains(key)
    }

    /// Insert or replace an entry, then evict least recently used entries until
    /// both bounds hold again. An entry costing more than `max_cost` on its own
    /// is evicted immediately.
    pub fn set(&mut self, key: impl Into<String>, entry: CacheEntry) {
        if !self.enabled {
            return;
        }
        let key = key.into();
        self.total_cost += Self::cost_of(&entry);
        if let Some(old) = self.entries.put(key.clone(), entry) {
            self.total_cost -= Self::cost_of(&old);
        }
        trace!("cached '{}' (cost {}/{})", key, self.total_cost, self.max_cost);
        self.evict();
    }

    fn evict(&mut self) {
        while self.entries.len() > self.max_entries || self.total_cost > self.max_cost {
            let Some((key, old)) = self.entries.pop_lru() else {
                break;
            };
            self.total_cost -= Self::cost_of(&old);
            self.stats.evictions += 1;
            debug!("evicted '{}' from variant cache", key);
        }
    }

    /// Drop one entry.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let old = self.entries.pop(key)?;
        self.total_cost -= Self::cost_of(&old);
        Some(old)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_cost = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_cost(&self) -> usize {
        self.total_cost
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { entries: self.entries.len(), total_cost: self.total_cost, ..self.stats }
    }
}
