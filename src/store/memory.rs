//! In-process key-value store with per-record TTL.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::store::{KeyValueStore, StoreError};

#[derive(Debug, Clone)]
struct Record {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Thread-safe map of key to record. Cloning shares the same map.
///
/// A record expires `ttl` after its last write; expired records read as absent.
/// `ttl = None` keeps records until they are taken or deleted.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Record>>,
    ttl: Option<Duration>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate the store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Records currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        self.check_available()?;
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        self.inner.insert(key.to_string(), Record { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .inner
            .get(key)
            .filter(|r| !r.is_expired(now))
            .map(|r| r.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .inner
            .remove(key)
            .filter(|(_, r)| !r.is_expired(now))
            .map(|(_, r)| r.value))
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.check_available()?;
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, r| !r.is_expired(now));
        Ok(before.saturating_sub(self.inner.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_take() {
        let store = MemoryStore::default();
        assert!(store.get("a").await.unwrap().is_none());

        store.put("a", Bytes::from_static(b"1")).await.unwrap();
        store.put("a", Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().unwrap(), Bytes::from_static(b"2"));

        assert_eq!(store.take("a").await.unwrap().unwrap(), Bytes::from_static(b"2"));
        assert!(store.take("a").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_expired_records_read_absent_and_purge() {
        let store = MemoryStore::new(Some(Duration::from_millis(20)));
        store.put("old", Bytes::from_static(b"x")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        store.put("fresh", Bytes::from_static(b"y")).await.unwrap();

        assert!(store.get("old").await.unwrap().is_none());
        assert_eq!(store.len(), 2);

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_store_errors_instead_of_absent() {
        let store = MemoryStore::default();
        store.set_available(false);
        assert!(matches!(store.get("a").await, Err(StoreError::Unavailable(_))));
        assert!(store.take("a").await.is_err());
        assert!(store.put("a", Bytes::new()).await.is_err());
    }
}
