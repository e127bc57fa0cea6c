//! In-memory cache with per-entry TTL and LRU eviction.
//!
//! Each entry carries its own TTL, set at write time. Expired entries are
//! removed lazily when read. When the cache is full the least recently
//! accessed entry is evicted to make room.
//!
//! Hit, miss and eviction counters are emitted as `tracing::debug` fields.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use zonegate_core::{Clock, SystemClock};

use crate::backend::{CacheBackend, CacheResult};

/// A single cached value with its expiry bookkeeping.
struct CacheEntry {
    value: Value,
    /// When this entry was written, in clock millis.
    inserted_at: u64,
    /// Zero means the entry never expires.
    ttl: Duration,
    /// Last read or write, in clock millis.
    last_accessed: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: u64) -> bool {
        let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        !self.ttl.is_zero() && now >= self.inserted_at.saturating_add(ttl_ms)
    }
}

/// Accumulated cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
    /// Monotonic tiebreaker so entries written in the same millisecond
    /// still have a well-defined LRU order.
    tick: u64,
}

/// Thread-safe in-memory [`CacheBackend`].
///
/// # Concurrency
///
/// All state sits behind one `std::sync::Mutex`. Lock hold time is a single
/// hash map operation; nothing slow ever runs under the lock.
pub struct MemoryCache {
    inner: Mutex<Inner>,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
                tick: 0,
            }),
            max_entries: max_entries.max(1),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn evict_lru(inner: &mut Inner) {
        let lru_key = inner
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = lru_key {
            inner.entries.remove(&key);
            inner.stats.evictions += 1;
            tracing::debug!(
                evicted_key = %key,
                cache_evictions = inner.stats.evictions,
                "cache LRU eviction"
            );
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let now = self.clock.now_millis();
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.tick += 1;
        let tick = inner.tick;

        let expired = match inner.entries.get(key) {
            None => {
                inner.stats.misses += 1;
                tracing::debug!(key, cache_misses = inner.stats.misses, "cache miss");
                return Ok(None);
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.misses += 1;
            tracing::debug!(key, cache_misses = inner.stats.misses, "cache miss (expired)");
            return Ok(None);
        }

        inner.stats.hits += 1;
        let hits = inner.stats.hits;
        let value = inner.entries.get_mut(key).map(|entry| {
            entry.last_accessed = tick;
            entry.value.clone()
        });
        tracing::debug!(key, cache_hits = hits, "cache hit");
        Ok(value)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<()> {
        let now = self.clock.now_millis();
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.tick += 1;

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_entries {
            Self::evict_lru(inner);
        }

        let entry = CacheEntry {
            value,
            inserted_at: now,
            ttl,
            last_accessed: inner.tick,
        };
        inner.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.lock().entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.lock().entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zonegate_core::ManualClock;

    fn cache_with_clock(max_entries: usize) -> (MemoryCache, ManualClock) {
        let clock = ManualClock::at_secs(1_000);
        let cache = MemoryCache::with_clock(max_entries, Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = MemoryCache::default();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn set_then_get() {
        let (cache, _) = cache_with_clock(16);
        cache.set("k", json!("nova"), Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(json!("nova")));
    }

    #[test]
    fn get_missing_is_none() {
        let (cache, _) = cache_with_clock(16);
        assert_eq!(cache.get("nope").unwrap(), None);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let (cache, _) = cache_with_clock(16);
        cache.set("k", json!("a"), Duration::from_secs(60)).unwrap();
        cache.set("k", json!("b"), Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(json!("b")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (cache, clock) = cache_with_clock(16);
        cache.set("k", json!("v"), Duration::from_secs(1)).unwrap();
        assert!(cache.get("k").unwrap().is_some());

        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.get("k").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn ttl_is_per_entry() {
        let (cache, clock) = cache_with_clock(16);
        cache.set("short", json!(1), Duration::from_secs(1)).unwrap();
        cache.set("long", json!(2), Duration::from_secs(3600)).unwrap();

        clock.advance(Duration::from_secs(10));

        assert_eq!(cache.get("short").unwrap(), None);
        assert_eq!(cache.get("long").unwrap(), Some(json!(2)));
    }

    #[test]
    fn zero_ttl_never_expires() {
        let (cache, clock) = cache_with_clock(16);
        cache.set("k", json!("v"), Duration::ZERO).unwrap();
        clock.advance(Duration::from_secs(86_400 * 365));
        assert_eq!(cache.get("k").unwrap(), Some(json!("v")));
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let (cache, clock) = cache_with_clock(16);
        cache.set("k", json!("v"), Duration::from_secs(u64::MAX)).unwrap();
        clock.advance(Duration::from_secs(86_400 * 365));
        assert_eq!(cache.get("k").unwrap(), Some(json!("v")));
    }

    #[test]
    fn rewrite_restarts_ttl() {
        let (cache, clock) = cache_with_clock(16);
        cache.set("k", json!("v1"), Duration::from_secs(10)).unwrap();
        clock.advance(Duration::from_secs(8));
        cache.set("k", json!("v2"), Duration::from_secs(10)).unwrap();
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get("k").unwrap(), Some(json!("v2")));
    }

    #[test]
    fn delete_removes_entry() {
        let (cache, _) = cache_with_clock(16);
        cache.set("k", json!("v"), Duration::from_secs(60)).unwrap();
        cache.delete("k").unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
        // Deleting a missing key is fine.
        cache.delete("k").unwrap();
    }

    #[test]
    fn evicts_least_recently_used() {
        let (cache, _) = cache_with_clock(3);
        cache.set("a", json!(1), Duration::ZERO).unwrap();
        cache.set("b", json!(2), Duration::ZERO).unwrap();
        cache.set("c", json!(3), Duration::ZERO).unwrap();

        // Touch "a" so "b" becomes the LRU entry.
        cache.get("a").unwrap();
        cache.set("d", json!(4), Duration::ZERO).unwrap();

        assert_eq!(cache.len(), 3);
        assert!(cache.get("a").unwrap().is_some());
        assert!(cache.get("b").unwrap().is_none());
        assert!(cache.get("c").unwrap().is_some());
        assert!(cache.get("d").unwrap().is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn replacing_key_does_not_evict() {
        let (cache, _) = cache_with_clock(2);
        cache.set("a", json!(1), Duration::ZERO).unwrap();
        cache.set("b", json!(2), Duration::ZERO).unwrap();
        cache.set("a", json!(3), Duration::ZERO).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let (cache, clock) = cache_with_clock(16);
        cache.set("k", json!("v"), Duration::from_secs(1)).unwrap();
        cache.get("k").unwrap();
        cache.get("k").unwrap();
        cache.get("other").unwrap();
        clock.advance(Duration::from_secs(5));
        cache.get("k").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn clear_drops_everything() {
        let (cache, _) = cache_with_clock(16);
        cache.set("a", json!(1), Duration::ZERO).unwrap();
        cache.set("b", json!(2), Duration::ZERO).unwrap();
        cache.clear().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn never_exceeds_max_entries() {
        let (cache, _) = cache_with_clock(5);
        for i in 0..20 {
            cache.set(&format!("k{i}"), json!(i), Duration::ZERO).unwrap();
            assert!(cache.len() <= 5);
        }
    }
}
