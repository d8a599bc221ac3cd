//! Job Queue
//!
//! Durable FIFO channel between submitters and workers with at-least-once
//! delivery: a delivery that is neither acked nor rejected (consumer crash,
//! lost connection) is delivered again.

pub mod amqp;
pub mod memory;
pub mod reconnect;

use async_trait::async_trait;
use std::sync::Arc;

pub use self::amqp::{AmqpJobQueue, AmqpQueueConnector};
pub use self::memory::MemoryJobQueue;
pub use self::reconnect::ReconnectingQueue;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("broker unavailable: {0}")]
    Connection(String),

    #[error("broker connection lost: {0}")]
    ConnectionLost(String),

    #[error("broker rejected the published message")]
    Rejected,

    #[error("broker operation failed: {0}")]
    Broker(String),
}

impl QueueError {
    /// Whether the consumer must reconnect before continuing
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            QueueError::Connection(_) | QueueError::ConnectionLost(_)
        )
    }
}

/// Settles a single delivery with the broker
#[async_trait]
pub trait DeliveryAcker: Send + Sync {
    async fn ack(&self) -> Result<(), QueueError>;

    async fn nack(&self, requeue: bool) -> Result<(), QueueError>;
}

/// A message handed to a consumer, settled exactly once by `ack` or `nack`
pub struct Delivery {
    pub body: Vec<u8>,
    /// Set when the broker has delivered this message before
    pub redelivered: bool,
    acker: Box<dyn DeliveryAcker>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, redelivered: bool, acker: impl DeliveryAcker + 'static) -> Self {
        Self {
            body,
            redelivered,
            acker: Box::new(acker),
        }
    }

    /// Removes the message from the queue
    pub async fn ack(self) -> Result<(), QueueError> {
        self.acker.ack().await
    }

    /// Rejects the message, returning it to the queue when `requeue` is set
    pub async fn nack(self, requeue: bool) -> Result<(), QueueError> {
        self.acker.nack(requeue).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("len", &self.body.len())
            .field("redelivered", &self.redelivered)
            .finish()
    }
}

/// Stream of deliveries for one consumer, one message in flight at a time
#[async_trait]
pub trait JobConsumer: Send {
    /// Waits for the next delivery
    ///
    /// Returns [`QueueError::ConnectionLost`] once the underlying connection is
    /// gone; the consumer is unusable afterwards.
    async fn next_delivery(&mut self) -> Result<Delivery, QueueError>;
}

/// Publisher and consumer factory for the job queue
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Publishes a persistent message, returning once the broker confirmed it
    async fn publish(&self, body: &[u8]) -> Result<(), QueueError>;

    /// Starts a consumer with a prefetch of one
    async fn consume(&self, consumer_tag: &str) -> Result<Box<dyn JobConsumer>, QueueError>;

    /// Closes the connection
    async fn close(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

/// Produces Job Queue connections for the supervisor
#[async_trait]
pub trait QueueConnector: Send + Sync {
    /// Name of the dependency as it appears in logs
    fn target(&self) -> String;

    /// Connects and declares the durable queue
    async fn connect(&self) -> Result<Arc<dyn JobQueue>, QueueError>;
}
