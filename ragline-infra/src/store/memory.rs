//! In-memory Status Store
//!
//! Same key layout and expiry semantics as the Redis store, held in a
//! process-local map. Used by the test suites and for local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ragline_core::domain::job::{JobId, StoredStatus};

use super::{StatusStore, StoreConnector, StoreError, parse_status};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

/// Process-local implementation of [`StatusStore`]
#[derive(Clone, Default)]
pub struct MemoryStatusStore {
    inner: Arc<Inner>,
    ttl: Option<Duration>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store applying `ttl` to every key written
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl: Some(ttl),
        }
    }

    /// Makes every operation fail with [`StoreError::Connection`] while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Reads a raw key, honoring expiry
    pub fn get_raw(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn entry(&self, value: &str) -> Entry {
        Entry {
            value: value.to_string(),
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn set(&self, key: String, value: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let entry = self.entry(value);
        self.entries().insert(key, entry);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        Ok(self.get_raw(key))
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn mark_queued(&self, job_id: &JobId) -> Result<(), StoreError> {
        self.set(job_id.status_key(), StoredStatus::Queued.as_str())
    }

    async fn status(&self, job_id: &JobId) -> Result<Option<StoredStatus>, StoreError> {
        let raw = self.get(&job_id.status_key())?;
        parse_status(job_id, raw)
    }

    async fn result(&self, job_id: &JobId) -> Result<Option<String>, StoreError> {
        self.get(&job_id.result_key())
    }

    async fn complete(&self, job_id: &JobId, result: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let result_entry = self.entry(result);
        let status_entry = self.entry(StoredStatus::Completed.as_str());

        let mut entries = self.entries();
        entries.insert(job_id.result_key(), result_entry);
        entries.insert(job_id.status_key(), status_entry);
        Ok(())
    }

    async fn mark_failed(&self, job_id: &JobId) -> Result<(), StoreError> {
        self.set(job_id.status_key(), StoredStatus::Failed.as_str())
    }

    async fn retire(&self, job_id: &JobId) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .entries()
            .remove(&job_id.status_key())
            .is_some_and(|entry| entry.is_live(now)))
    }
}

#[async_trait]
impl StoreConnector for MemoryStatusStore {
    fn target(&self) -> String {
        "in-memory store".to_string()
    }

    async fn connect(&self) -> Result<Arc<dyn StatusStore>, StoreError> {
        self.check_available()?;
        Ok(Arc::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_lifecycle() {
        let store = MemoryStatusStore::new();
        let id = JobId::new();

        assert_eq!(store.status(&id).await.unwrap(), None);

        store.mark_queued(&id).await.unwrap();
        assert_eq!(store.status(&id).await.unwrap(), Some(StoredStatus::Queued));
        assert_eq!(store.result(&id).await.unwrap(), None);

        store.complete(&id, "answer").await.unwrap();
        assert_eq!(
            store.status(&id).await.unwrap(),
            Some(StoredStatus::Completed)
        );
        assert_eq!(store.result(&id).await.unwrap().as_deref(), Some("answer"));

        assert!(store.retire(&id).await.unwrap());
        assert!(!store.retire(&id).await.unwrap());
        assert_eq!(store.status(&id).await.unwrap(), None);
        assert_eq!(store.result(&id).await.unwrap().as_deref(), Some("answer"));
    }

    #[tokio::test]
    async fn test_raw_key_layout() {
        let store = MemoryStatusStore::new();
        let id = JobId::new();
        store.complete(&id, "Y").await.unwrap();

        assert_eq!(
            store.get_raw(&format!("status_{}", id)).as_deref(),
            Some("completed")
        );
        assert_eq!(store.get_raw(&id.to_string()).as_deref(), Some("Y"));
    }

    #[tokio::test]
    async fn test_duplicate_completion_overwrites() {
        let store = MemoryStatusStore::new();
        let id = JobId::new();
        store.complete(&id, "first").await.unwrap();
        store.complete(&id, "first").await.unwrap();

        assert_eq!(store.result(&id).await.unwrap().as_deref(), Some("first"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_ttl_expires_keys() {
        let store = MemoryStatusStore::with_ttl(Duration::from_millis(20));
        let id = JobId::new();
        store.mark_queued(&id).await.unwrap();
        assert!(store.status(&id).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.status(&id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_status_is_reported() {
        let store = MemoryStatusStore::new();
        let id = JobId::new();
        store.set(id.status_key(), "bogus").unwrap();

        assert!(matches!(
            store.status(&id).await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStatusStore::new();
        store.set_unavailable(true);
        let id = JobId::new();

        assert!(matches!(
            store.mark_queued(&id).await,
            Err(StoreError::Connection(_))
        ));
        assert!(store.connect().await.is_err());

        store.set_unavailable(false);
        assert!(store.mark_queued(&id).await.is_ok());
    }
}
