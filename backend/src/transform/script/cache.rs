//! Memo cache for evaluated scripts.
//!
//! Keys are fully substituted script texts, values are the evaluated cells.
//! Evaluation is a pure function of the text, so two threads racing on the
//! same key compute the same value and either insert wins.

use lru::LruCache;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::error::ExpressionResult;

/// Process-wide cache used by computed columns.
pub static SCRIPT_CACHE: Lazy<ScriptCache> =
    Lazy::new(|| ScriptCache::new(Config::from_env().script_cache_size));

/// Bounded map from script text to result, evicting the least recently used
/// entry first.
#[derive(Debug)]
pub struct ScriptCache {
    /// `None` when caching is disabled.
    entries: Option<Mutex<LruCache<String, Value>>>,
    evictions: AtomicU64,
}

impl ScriptCache {
    /// Create a cache holding at most `capacity` entries. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<String, Value>>> {
        // Entries are write-once; a panic elsewhere cannot leave one half-written.
        self.entries
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock()?.get(key).cloned()
    }

    pub fn insert(&self, key: String, value: Value) {
        let Some(mut cache) = self.lock() else {
            return;
        };
        if cache.contains(&key) {
            return;
        }
        if cache.push(key, value).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// Errors are returned to the caller and not cached.
    pub fn get_or_try_insert_with<F>(&self, key: &str, compute: F) -> ExpressionResult<Value>
    where
        F: FnOnce() -> ExpressionResult<Value>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        // Computed without holding the lock.
        let value = compute()?;
        self.insert(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |cache| cache.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().map_or(0, |cache| cache.cap().get())
    }

    /// Number of entries evicted since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        if let Some(mut cache) = self.lock() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_computes_once() {
        let cache = ScriptCache::new(8);
        let calls = Cell::new(0);
        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("2+3", || {
                    calls.set(calls.get() + 1);
                    Ok(json!(5))
                })
                .unwrap();
            assert_eq!(value, json!(5));
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ScriptCache::new(2);
        cache.insert("a".into(), json!(1));
        cache.insert("b".into(), json!(2));
        // Touching "a" leaves "b" as the eviction candidate.
        assert_eq!(cache.get("a"), Some(json!(1)));
        cache.insert("c".into(), json!(3));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(json!(1)));
        assert_eq!(cache.get("c"), Some(json!(3)));
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn test_reinsert_is_not_an_eviction() {
        let cache = ScriptCache::new(1);
        cache.insert("a".into(), json!(1));
        cache.insert("a".into(), json!(1));
        assert_eq!(cache.evictions(), 0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_errors_not_cached() {
        let cache = ScriptCache::new(4);
        let result = cache.get_or_try_insert_with("bad", || {
            Err(crate::error::ExpressionError::UnknownFunction("x".into()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = ScriptCache::new(0);
        cache.insert("a".into(), json!(1));
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 0);
        assert_eq!(cache.get("a"), None);
    }
}
