//! Reconnecting Job Queue handle
//!
//! Holds the current broker connection. An operation that fails because the
//! connection is gone re-acquires it through the supervisor and runs once
//! more on the fresh connection. Concurrent callers that hit the same dead
//! connection share a single reconnect.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{JobConsumer, JobQueue, QueueConnector, QueueError};
use crate::supervisor::{ConnectionSupervisor, SupervisorError};

pub struct ReconnectingQueue {
    connector: Arc<dyn QueueConnector>,
    supervisor: ConnectionSupervisor,
    current: RwLock<Arc<dyn JobQueue>>,
}

impl ReconnectingQueue {
    /// Wraps an already acquired connection
    ///
    /// # Arguments
    /// * `connector` - Produces replacement connections
    /// * `supervisor` - Retry policy used when reconnecting
    /// * `initial` - Connection to start with
    pub fn new(
        connector: Arc<dyn QueueConnector>,
        supervisor: ConnectionSupervisor,
        initial: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            connector,
            supervisor,
            current: RwLock::new(initial),
        }
    }

    /// Acquires the first connection with `supervisor`
    pub async fn connect(
        connector: Arc<dyn QueueConnector>,
        supervisor: ConnectionSupervisor,
    ) -> Result<Self, SupervisorError> {
        let initial = supervisor.acquire_queue(connector.as_ref()).await?;
        Ok(Self::new(connector, supervisor, initial))
    }

    async fn current(&self) -> Arc<dyn JobQueue> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replaces `stale` unless another caller already did
    async fn reconnect(&self, stale: &Arc<dyn JobQueue>) -> Result<Arc<dyn JobQueue>, QueueError> {
        let mut current = self.current.write().await;
        if !Arc::ptr_eq(&*current, stale) {
            return Ok(Arc::clone(&*current));
        }

        let fresh = self
            .supervisor
            .acquire_queue(self.connector.as_ref())
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        if let Err(e) = stale.close().await {
            debug!("Failed to close stale broker connection: {}", e);
        }

        *current = Arc::clone(&fresh);
        Ok(fresh)
    }
}

#[async_trait]
impl JobQueue for ReconnectingQueue {
    async fn publish(&self, body: &[u8]) -> Result<(), QueueError> {
        let queue = self.current().await;
        match queue.publish(body).await {
            Err(e) if e.is_connection_error() => {
                warn!(
                    dependency = %self.connector.target(),
                    "Publish failed, reconnecting: {}", e
                );
                self.reconnect(&queue).await?.publish(body).await
            }
            other => other,
        }
    }

    async fn consume(&self, consumer_tag: &str) -> Result<Box<dyn JobConsumer>, QueueError> {
        let queue = self.current().await;
        match queue.consume(consumer_tag).await {
            Err(e) if e.is_connection_error() => {
                warn!(
                    dependency = %self.connector.target(),
                    "Consume failed, reconnecting: {}", e
                );
                self.reconnect(&queue).await?.consume(consumer_tag).await
            }
            other => other,
        }
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.current().await.close().await
    }
}
