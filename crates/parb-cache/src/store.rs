// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The keyed cache store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parb_core::types::WireType;

// =============================================================================
// Configuration
// =============================================================================

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    /// Maximum number of entries before eviction kicks in.
    pub max_entries: usize,

    /// Default TTL applied when a set carries none, in seconds.
    /// Zero disables expiry.
    pub default_ttl_seconds: u64,

    /// Minimum interval between lazy expiry sweeps, in seconds.
    pub cleanup_interval_seconds: u64,

    /// Whether hit/miss/eviction counters are maintained.
    pub enable_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_seconds: 300,
            cleanup_interval_seconds: 60,
            enable_stats: true,
        }
    }
}

impl CacheConfig {
    /// Returns the default TTL as a duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Returns the cleanup interval as a duration.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Cache statistics. Hit and miss counters are monotone.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently stored.
    pub total_entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that fell through to the bus.
    pub misses: u64,
    /// Entries removed by LRU eviction.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub timeouts: u64,
    /// Approximate memory footprint in bytes.
    pub memory_used: u64,
}

impl CacheStats {
    /// Hit rate in [0, 1]; zero when no lookups happened yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    wire_type: WireType,
    created_at: Instant,
    ttl: Duration,
    access_count: u32,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        !self.ttl.is_zero() && now.duration_since(self.created_at) > self.ttl
    }

    /// Eviction priority: lower evicts first.
    fn priority(&self, now: Instant) -> u64 {
        self.access_count as u64 + now.duration_since(self.created_at).as_secs() / 60
    }

    fn memory(&self, key: &str) -> u64 {
        (std::mem::size_of::<CacheEntry>() + key.len() + self.value.len()) as u64
    }
}

// =============================================================================
// ParamCache
// =============================================================================

struct Inner {
    map: HashMap<String, CacheEntry>,
    stats: CacheStats,
    last_cleanup: Instant,
}

/// The concurrent keyed parameter cache.
///
/// Keys are fully qualified parameter names; values are the wire rendering
/// plus wire type last observed on the bus.
pub struct ParamCache {
    inner: Mutex<Inner>,
    config: CacheConfig,
}

impl ParamCache {
    /// Creates a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::with_capacity(config.max_entries.min(4096)),
                stats: CacheStats::default(),
                last_cleanup: Instant::now(),
            }),
            config,
        }
    }

    /// Creates a cache with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Looks up a key.
    ///
    /// A present-but-expired entry is removed on access and counted as both
    /// a timeout and a miss.
    pub fn get(&self, key: &str) -> Option<(String, WireType)> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        self.maybe_sweep(inner, now);

        let expired = match inner.map.get(key) {
            None => {
                if self.config.enable_stats {
                    inner.stats.misses += 1;
                }
                return None;
            }
            Some(entry) => entry.expired(now),
        };

        if expired {
            if let Some(removed) = inner.map.remove(key) {
                inner.stats.memory_used = inner
                    .stats
                    .memory_used
                    .saturating_sub(removed.memory(key));
            }
            inner.stats.total_entries = inner.map.len();
            if self.config.enable_stats {
                inner.stats.timeouts += 1;
                inner.stats.misses += 1;
            }
            return None;
        }

        let entry = inner.map.get_mut(key).expect("presence checked above");
        entry.access_count += 1;
        let hit = (entry.value.clone(), entry.wire_type);
        if self.config.enable_stats {
            inner.stats.hits += 1;
        }
        Some(hit)
    }

    /// Inserts or overwrites a key.
    ///
    /// `ttl` of `None` applies the configured default. Overwriting refreshes
    /// `created_at`. At capacity, `ceil(max_entries / 10)` entries are
    /// evicted by LRU priority before the insert.
    pub fn set(&self, key: &str, value: &str, wire_type: WireType, ttl: Option<Duration>) {
        let now = Instant::now();
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        self.maybe_sweep(inner, now);

        if let Some(entry) = inner.map.get_mut(key) {
            let old_mem = entry.memory(key);
            entry.value = value.to_string();
            entry.wire_type = wire_type;
            entry.created_at = now;
            entry.ttl = ttl;
            let new_mem = entry.memory(key);
            inner.stats.memory_used = inner.stats.memory_used - old_mem + new_mem;
            return;
        }

        if inner.map.len() >= self.config.max_entries {
            let count = self.config.max_entries.div_ceil(10);
            self.evict_locked(inner, count, now);
        }

        let entry = CacheEntry {
            value: value.to_string(),
            wire_type,
            created_at: now,
            ttl,
            access_count: 0,
        };
        inner.stats.memory_used += entry.memory(key);
        inner.map.insert(key.to_string(), entry);
        inner.stats.total_entries = inner.map.len();
    }

    /// Removes a key. Returns `true` if it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.map.remove(key) {
            inner.stats.memory_used = inner.stats.memory_used.saturating_sub(entry.memory(key));
            inner.stats.total_entries = inner.map.len();
            true
        } else {
            false
        }
    }

    /// Removes every key matched by `pattern`.
    ///
    /// A trailing `*` matches by prefix; otherwise the match is exact.
    /// Returns the number of removed entries.
    pub fn invalidate_wildcard(&self, pattern: &str) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = match pattern.strip_suffix('*') {
            Some(prefix) => inner
                .map
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            None => inner.map.keys().filter(|k| *k == pattern).cloned().collect(),
        };

        for key in &keys {
            if let Some(entry) = inner.map.remove(key) {
                inner.stats.memory_used =
                    inner.stats.memory_used.saturating_sub(entry.memory(key));
            }
        }
        inner.stats.total_entries = inner.map.len();
        if !keys.is_empty() {
            debug!(pattern, removed = keys.len(), "wildcard invalidation");
        }
        keys.len()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.stats.total_entries = 0;
        inner.stats.memory_used = 0;
    }

    /// Removes all expired entries immediately. Returns the removed count.
    pub fn expire_sweep(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.sweep_locked(&mut inner, now)
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> CacheStats {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        self.maybe_sweep(&mut inner, now);
        inner.stats
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Returns `true` when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn maybe_sweep(&self, inner: &mut Inner, now: Instant) {
        if now.duration_since(inner.last_cleanup) > self.config.cleanup_interval() {
            self.sweep_locked(inner, now);
        }
    }

    fn sweep_locked(&self, inner: &mut Inner, now: Instant) -> usize {
        let expired: Vec<String> = inner
            .map
            .iter()
            .filter(|(_, e)| e.expired(now))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            if let Some(entry) = inner.map.remove(key) {
                inner.stats.memory_used =
                    inner.stats.memory_used.saturating_sub(entry.memory(key));
                if self.config.enable_stats {
                    inner.stats.timeouts += 1;
                }
            }
        }
        inner.stats.total_entries = inner.map.len();
        inner.last_cleanup = now;
        if !expired.is_empty() {
            debug!(removed = expired.len(), "expiry sweep");
        }
        expired.len()
    }

    /// Evicts up to `count` entries by priority, lowest first.
    ///
    /// Priority is `access_count + age_minutes`; ties break by snapshot
    /// order, so the outcome is deterministic for a given store state.
    fn evict_locked(&self, inner: &mut Inner, count: usize, now: Instant) {
        let mut candidates: Vec<(String, u64)> = inner
            .map
            .iter()
            .map(|(k, e)| (k.clone(), e.priority(now)))
            .collect();
        candidates.sort_by(|a, b| a.1.cmp(&b.1));

        let mut evicted = 0usize;
        for (key, _) in candidates.into_iter().take(count) {
            if let Some(entry) = inner.map.remove(&key) {
                inner.stats.memory_used =
                    inner.stats.memory_used.saturating_sub(entry.memory(&key));
                if self.config.enable_stats {
                    inner.stats.evictions += 1;
                }
                evicted += 1;
            }
        }
        inner.stats.total_entries = inner.map.len();
        debug!(evicted, "lru eviction");
    }
}

impl std::fmt::Debug for ParamCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ParamCache")
            .field("entries", &inner.map.len())
            .field("max_entries", &self.config.max_entries)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache(max_entries: usize) -> ParamCache {
        ParamCache::new(CacheConfig {
            max_entries,
            default_ttl_seconds: 300,
            cleanup_interval_seconds: 60,
            enable_stats: true,
        })
    }

    #[test]
    fn test_set_then_get() {
        let cache = small_cache(10);
        cache.set("Device.X", "42", WireType::Int, None);
        assert_eq!(cache.get("Device.X"), Some(("42".to_string(), WireType::Int)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_miss_counts() {
        let cache = small_cache(10);
        assert_eq!(cache.get("absent"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let cache = small_cache(10);
        cache.set("k", "v", WireType::String, None);
        cache.set("k", "v", WireType::String, None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some(("v".to_string(), WireType::String)));
    }

    #[test]
    fn test_delete_then_get_misses() {
        let cache = small_cache(10);
        cache.set("k", "v", WireType::String, None);
        assert!(cache.delete("k"));
        assert!(!cache.delete("k"));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_expiry_counts_timeout_and_miss() {
        let cache = small_cache(10);
        cache.set("k", "v", WireType::String, Some(Duration::from_nanos(1)));
        std::thread::sleep(Duration::from_millis(2));

        assert_eq!(cache.get("k"), None);
        let stats = cache.stats();
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let cache = small_cache(10);
        cache.set("k", "v", WireType::String, Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn test_eviction_count_at_capacity() {
        let cache = small_cache(10);
        for i in 0..10 {
            cache.set(&format!("Device.P{}", i), "v", WireType::String, None);
        }
        assert_eq!(cache.len(), 10);

        // Insert at capacity: ceil(10/10) = 1 eviction, then the insert.
        cache.set("Device.New", "v", WireType::String, None);
        assert_eq!(cache.len(), 10);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_eviction_prefers_cold_entries() {
        let cache = small_cache(10);
        for i in 0..10 {
            cache.set(&format!("Device.P{}", i), "v", WireType::String, None);
        }
        // Warm up everything except P3.
        for i in 0..10 {
            if i != 3 {
                let _ = cache.get(&format!("Device.P{}", i));
            }
        }

        cache.set("Device.New", "v", WireType::String, None);
        assert_eq!(cache.get("Device.P3"), None, "cold entry should be evicted");
        assert!(cache.get("Device.New").is_some());
    }

    #[test]
    fn test_wildcard_invalidation_prefix() {
        let cache = small_cache(20);
        cache.set("Device.WiFi.Radio.1.Enable", "true", WireType::Bool, None);
        cache.set("Device.WiFi.Radio.2.Enable", "false", WireType::Bool, None);
        cache.set("Device.Ethernet.1.Enable", "true", WireType::Bool, None);

        let removed = cache.invalidate_wildcard("Device.WiFi.*");
        assert_eq!(removed, 2);
        assert_eq!(cache.get("Device.WiFi.Radio.1.Enable"), None);
        assert!(cache.get("Device.Ethernet.1.Enable").is_some());
    }

    #[test]
    fn test_wildcard_invalidation_exact() {
        let cache = small_cache(20);
        cache.set("Device.A", "1", WireType::Int, None);
        cache.set("Device.AB", "2", WireType::Int, None);

        let removed = cache.invalidate_wildcard("Device.A");
        assert_eq!(removed, 1);
        assert_eq!(cache.get("Device.A"), None);
        assert!(cache.get("Device.AB").is_some());
    }

    #[test]
    fn test_expire_sweep_bulk() {
        let cache = small_cache(20);
        for i in 0..5 {
            cache.set(&format!("short{}", i), "v", WireType::String, Some(Duration::from_nanos(1)));
        }
        cache.set("long", "v", WireType::String, Some(Duration::from_secs(60)));
        std::thread::sleep(Duration::from_millis(2));

        assert_eq!(cache.expire_sweep(), 5);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().timeouts, 5);
    }

    #[test]
    fn test_clear() {
        let cache = small_cache(10);
        cache.set("a", "1", WireType::Int, None);
        cache.set("b", "2", WireType::Int, None);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().memory_used, 0);
    }

    #[test]
    fn test_memory_accounting_tracks_removals() {
        let cache = small_cache(10);
        cache.set("key", "value", WireType::String, None);
        let used = cache.stats().memory_used;
        assert!(used > 0);
        cache.delete("key");
        assert_eq!(cache.stats().memory_used, 0);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;

        let cache = Arc::new(small_cache(1000));
        let mut handles = Vec::new();
        for t in 0..8 {
            let c = cache.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("Device.T{}.P{}", t, i);
                    c.set(&key, "v", WireType::String, None);
                    assert!(c.get(&key).is_some());
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
