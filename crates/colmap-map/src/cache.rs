//! Bounded caches keyed by normalized header sets.
//!
//! Two header lists that differ only in order, case or surrounding whitespace
//! produce the same [`CacheKey`], so schema-equivalent inputs share one entry.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Default number of entries kept by [`LruTtlCache`].
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default time-to-live for cache entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries currently stored.
    pub size: usize,
    /// Backing tier name, e.g. "memory".
    pub level: String,
}

/// A bounded key/value store. Implementations must be safe to share across
/// tasks.
pub trait BoundedCache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V);
    fn clear(&self);
    fn stats(&self) -> CacheStats;
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

struct LruState<V> {
    entries: LruCache<String, Entry<V>>,
    hits: u64,
    misses: u64,
}

/// In-memory LRU cache with a per-entry time-to-live.
pub struct LruTtlCache<V> {
    state: Mutex<LruState<V>>,
    ttl: Duration,
}

impl<V> LruTtlCache<V> {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(LruState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<V> Default for LruTtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl<V: Clone + Send> BoundedCache<V> for LruTtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let lookup = state.entries.get(key).map(|entry| {
            (entry.inserted_at.elapsed() <= self.ttl).then(|| entry.value.clone())
        });
        let fresh = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                state.entries.pop(key);
                None
            }
            None => None,
        };
        if fresh.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        fresh
    }

    fn set(&self, key: &str, value: V) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.put(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
    }

    fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            size: state.entries.len(),
            level: "memory".to_string(),
        }
    }
}

/// Lowercased, trimmed and sorted copy of `headers`.
pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    normalized.sort();
    normalized
}

/// Lowercased and trimmed header.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Stable digest of a normalized header set, optionally scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(headers: &[String]) -> Self {
        Self::scoped("", headers)
    }

    /// Key for `headers` within `scope`. An empty scope equals [`CacheKey::new`].
    pub fn scoped(scope: &str, headers: &[String]) -> Self {
        let mut hasher = Sha256::new();
        if !scope.is_empty() {
            hasher.update(scope.as_bytes());
            hasher.update([0x1f]);
        }
        for header in normalize_headers(headers) {
            hasher.update(header.as_bytes());
            hasher.update([0x1e]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Cache front end that keys values by normalized header sets.
pub struct NormalizedCache<V> {
    inner: Box<dyn BoundedCache<V>>,
}

impl<V> NormalizedCache<V> {
    pub fn new(inner: impl BoundedCache<V> + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.inner.get(key.as_str())
    }

    pub fn set(&self, key: &CacheKey, value: V) {
        self.inner.set(key.as_str(), value);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

impl<V: Clone + Send + 'static> Default for NormalizedCache<V> {
    fn default() -> Self {
        Self::new(LruTtlCache::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn equivalent_header_lists_collide() {
        let a = CacheKey::new(&headers(&["ID", "Title", "Status"]));
        let b = CacheKey::new(&headers(&["status", "id", "title"]));
        let c = CacheKey::new(&headers(&["  ID  ", "\tTitle\n", "  STATUS  "]));
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn different_headers_or_scopes_differ() {
        let base = headers(&["ID", "Title"]);
        assert_ne!(
            CacheKey::new(&base),
            CacheKey::new(&headers(&["ID", "Name"]))
        );
        assert_ne!(
            CacheKey::new(&base),
            CacheKey::scoped("test_case", &base)
        );
        assert_eq!(CacheKey::new(&base), CacheKey::scoped("", &base));
    }

    #[test]
    fn stored_value_is_found_under_any_variant() {
        let cache: NormalizedCache<u32> = NormalizedCache::default();
        cache.set(&CacheKey::new(&headers(&["ID", "Title", "Status"])), 7);
        let hit = cache.get(&CacheKey::new(&headers(&["status", " id ", "TITLE"])));
        assert_eq!(hit, Some(7));
        assert_eq!(cache.get(&CacheKey::new(&headers(&["other"]))), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.level, "memory");
    }

    #[test]
    fn lru_evicts_least_recent() {
        let cache = LruTtlCache::new(2, DEFAULT_TTL);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.stats().size, 2);
    }

    #[test]
    fn expired_entries_miss() {
        let cache = LruTtlCache::new(4, Duration::ZERO);
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn clear_empties_cache() {
        let cache = LruTtlCache::new(4, DEFAULT_TTL);
        cache.set("a", 1);
        cache.clear();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache = LruTtlCache::new(0, DEFAULT_TTL);
        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));
    }
}
