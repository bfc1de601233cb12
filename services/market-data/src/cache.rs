//! Small TTL cache for read-side views
//!
//! Market-data endpoints are hit far more often than the book changes, so
//! each view is recomputed at most once per TTL window. The cache is an
//! explicit collaborator of [`crate::MarketDataService`]: tests construct
//! it with whatever TTL they need instead of monkey-patching time.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key`, or compute, store and return a
    /// fresh one. A failed computation caches nothing.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut entries = self.entries.lock();
        if let Some((at, value)) = entries.get(&key) {
            if at.elapsed() < self.ttl {
                return Ok(value.clone());
            }
        }
        let value = compute()?;
        entries.insert(key, (Instant::now(), value.clone()));
        Ok(value)
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.lock().remove(key);
    }

    /// Drop every entry past its TTL.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.lock().retain(|_, (at, _)| at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<u32, &'static str>;

    #[test]
    fn test_fresh_entry_is_served_from_cache() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;
        for _ in 0..2 {
            let got: TestResult = cache.get_or_try_insert_with("k", || {
                calls += 1;
                Ok(42)
            });
            assert_eq!(got, Ok(42));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_expired_entry_is_recomputed() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_millis(0));
        let mut calls = 0;
        for _ in 0..3 {
            let _: TestResult = cache.get_or_try_insert_with("k", || {
                calls += 1;
                Ok(calls)
            });
        }
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_failed_computation_caches_nothing() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let err: TestResult = cache.get_or_try_insert_with("k", || Err("boom"));
        assert!(err.is_err());
        assert!(cache.is_empty());

        let ok: TestResult = cache.get_or_try_insert_with("k", || Ok(7));
        assert_eq!(ok, Ok(7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let _: TestResult = cache.get_or_try_insert_with("k", || Ok(1));
        cache.invalidate(&"k");
        let v: TestResult = cache.get_or_try_insert_with("k", || Ok(2));
        assert_eq!(v, Ok(2));
    }
}
