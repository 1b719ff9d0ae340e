// Cache backends used by the `{% cache %}` tag.
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::errors::{Error, Result};

pub trait CacheBackend: Send + Sync {
    /// Returns the stored bytes, `None` for a missing or expired key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value`. A `None` timeout keeps it for the backend's lifetime.
    fn set(&self, key: &str, value: Vec<u8>, timeout: Option<Duration>) -> Result<()>;

    fn delete(&self, key: &str) -> Result<bool>;

    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::msg("cache lock was poisoned")
}

/// A process-local cache, like Django's `LocMemCache`.
#[derive(Debug, Default)]
pub struct LocMemCache {
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl LocMemCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.store
            .read()
            .map(|store| store.values().filter(|e| !e.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for LocMemCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.read().map_err(poisoned)?;
        Ok(store.get(key).filter(|e| !e.is_expired()).map(|e| e.value.clone()))
    }

    fn set(&self, key: &str, value: Vec<u8>, timeout: Option<Duration>) -> Result<()> {
        let mut store = self.store.write().map_err(poisoned)?;
        // expired entries are dropped lazily on writes
        store.retain(|_, e| !e.is_expired());
        // a timeout past what the clock can represent never expires
        let expires_at = timeout.and_then(|d| Instant::now().checked_add(d));
        store.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut store = self.store.write().map_err(poisoned)?;
        Ok(store.remove(key).is_some())
    }

    fn clear(&self) -> Result<()> {
        self.store.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

/// A cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyCache;

impl CacheBackend for DummyCache {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: Vec<u8>, _timeout: Option<Duration>) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locmem_round_trip() {
        let cache = LocMemCache::new();
        assert_eq!(cache.get("a").unwrap(), None);
        cache.set("a", b"hello".to_vec(), None).unwrap();
        assert_eq!(cache.get("a").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(cache.len(), 1);
        assert!(cache.delete("a").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = LocMemCache::new();
        cache.set("a", b"x".to_vec(), Some(Duration::from_millis(0))).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a").unwrap(), None);
    }

    #[test]
    fn huge_timeouts_are_kept() {
        let cache = LocMemCache::new();
        cache.set("a", b"x".to_vec(), Some(Duration::from_secs(i64::MAX as u64))).unwrap();
        cache.set("b", b"y".to_vec(), Some(Duration::MAX)).unwrap();
        assert_eq!(cache.get("a").unwrap(), Some(b"x".to_vec()));
        assert_eq!(cache.get("b").unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn dummy_never_stores() {
        let cache = DummyCache;
        cache.set("a", b"x".to_vec(), None).unwrap();
        assert_eq!(cache.get("a").unwrap(), None);
    }
}
