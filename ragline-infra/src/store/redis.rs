//! Redis-backed Status Store
//!
//! Uses a `ConnectionManager`, which reconnects on its own after the first
//! successful connection. Completion is written in a MULTI/EXEC pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragline_core::domain::job::{JobId, StoredStatus};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{StatusStore, StoreConnector, StoreError, parse_status};
use crate::config::redact_url;

/// Redis implementation of [`StatusStore`]
#[derive(Clone)]
pub struct RedisStatusStore {
    conn: ConnectionManager,
    ttl: Option<Duration>,
}

impl RedisStatusStore {
    /// Connect to Redis and verify the connection with `PING`
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379/0")
    /// * `ttl` - Expiry applied to every key written, `None` for no expiry
    pub async fn connect(redis_url: &str, ttl: Option<Duration>) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("invalid redis url: {}", e)))?;

        let mut conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { conn, ttl })
    }

    fn ttl_secs(&self) -> Option<u64> {
        self.ttl.map(|ttl| ttl.as_secs().max(1))
    }

    async fn set(&self, key: String, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match self.ttl_secs() {
            Some(secs) => conn.set_ex::<_, _, ()>(key, value, secs).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&self, key: String) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn mark_queued(&self, job_id: &JobId) -> Result<(), StoreError> {
        self.set(job_id.status_key(), StoredStatus::Queued.as_str())
            .await
    }

    async fn status(&self, job_id: &JobId) -> Result<Option<StoredStatus>, StoreError> {
        let raw = self.get(job_id.status_key()).await?;
        parse_status(job_id, raw)
    }

    async fn result(&self, job_id: &JobId) -> Result<Option<String>, StoreError> {
        self.get(job_id.result_key()).await
    }

    async fn complete(&self, job_id: &JobId, result: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();

        match self.ttl_secs() {
            Some(secs) => {
                pipe.set_ex(job_id.result_key(), result, secs)
                    .ignore()
                    .set_ex(job_id.status_key(), StoredStatus::Completed.as_str(), secs)
                    .ignore();
            }
            None => {
                pipe.set(job_id.result_key(), result)
                    .ignore()
                    .set(job_id.status_key(), StoredStatus::Completed.as_str())
                    .ignore();
            }
        }

        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn mark_failed(&self, job_id: &JobId) -> Result<(), StoreError> {
        self.set(job_id.status_key(), StoredStatus::Failed.as_str())
            .await
    }

    async fn retire(&self, job_id: &JobId) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(job_id.status_key()).await?;
        Ok(removed > 0)
    }
}

/// Connects [`RedisStatusStore`] instances for the supervisor
#[derive(Debug, Clone)]
pub struct RedisStoreConnector {
    redis_url: String,
    ttl: Option<Duration>,
}

impl RedisStoreConnector {
    pub fn new(redis_url: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ttl,
        }
    }
}

#[async_trait]
impl StoreConnector for RedisStoreConnector {
    fn target(&self) -> String {
        format!("redis ({})", redact_url(&self.redis_url))
    }

    async fn connect(&self) -> Result<Arc<dyn StatusStore>, StoreError> {
        let store = RedisStatusStore::connect(&self.redis_url, self.ttl).await?;
        Ok(Arc::new(store))
    }
}
