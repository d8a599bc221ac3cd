//! Worker loop
//!
//! Acquires the job queue, consumes with a prefetch of one and hands each
//! delivery to the [`JobHandler`]. Losing the broker is never fatal: the
//! loop waits and reconnects through the supervisor, which backs off
//! exponentially for as long as the broker stays away.

use ragline_infra::{ConnectionSupervisor, JobQueue, QueueConnector, QueueError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::service::{JobHandler, Outcome};

pub struct WorkerLoop {
    connector: Arc<dyn QueueConnector>,
    supervisor: ConnectionSupervisor,
    handler: JobHandler,
    consumer_tag: String,
}

impl WorkerLoop {
    /// Creates a new worker loop
    ///
    /// # Arguments
    /// * `connector` - Produces job queue connections
    /// * `supervisor` - Retry policy for (re)connecting
    /// * `handler` - Settles individual deliveries
    /// * `consumer_tag` - Identifies this worker to the broker
    pub fn new(
        connector: Arc<dyn QueueConnector>,
        supervisor: ConnectionSupervisor,
        handler: JobHandler,
        consumer_tag: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            supervisor,
            handler,
            consumer_tag: consumer_tag.into(),
        }
    }

    /// Runs until the surrounding task is cancelled
    pub async fn run(&self) {
        loop {
            let queue = match self.supervisor.acquire_queue(self.connector.as_ref()).await {
                Ok(queue) => queue,
                Err(e) => {
                    error!("{}", e);
                    self.pause().await;
                    continue;
                }
            };

            let Err(e) = self.consume(queue.as_ref()).await;
            if e.is_connection_error() {
                warn!("Broker connection lost: {}", e);
            } else {
                error!("Consumer stopped: {}", e);
            }

            if let Err(e) = queue.close().await {
                debug!("Failed to close broker connection: {}", e);
            }
            self.pause().await;
        }
    }

    /// Consumes until the connection fails
    async fn consume(&self, queue: &dyn JobQueue) -> Result<std::convert::Infallible, QueueError> {
        let mut consumer = queue.consume(&self.consumer_tag).await?;
        info!(consumer_tag = %self.consumer_tag, "Waiting for queries");

        loop {
            let delivery = consumer.next_delivery().await?;

            match self.handler.handle(delivery).await? {
                Outcome::Completed(job_id) => debug!(job_id = %job_id, "Delivery acknowledged"),
                Outcome::Failed(job_id) => debug!(job_id = %job_id, "Delivery settled as failed"),
                Outcome::Requeued(job_id) => debug!(job_id = %job_id, "Delivery returned"),
                Outcome::Rejected => debug!("Delivery dead-lettered"),
            }
        }
    }

    async fn pause(&self) {
        let delay = self.supervisor.policy().initial_delay;
        info!("Reconnecting to broker in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragline_core::codec;
    use ragline_core::domain::job::{Job, JobId};
    use ragline_infra::queue::MemoryJobQueue;
    use ragline_infra::store::MemoryStatusStore;
    use ragline_infra::{RetryPolicy, StatusStore};
    use std::time::Duration;
    use tokio::sync::Notify;

    use crate::service::QueryProcessor;

    struct Echo;

    #[async_trait]
    impl QueryProcessor for Echo {
        async fn process(&self, query: &str) -> anyhow::Result<String> {
            Ok(format!("answer to {}", query))
        }
    }

    /// Blocks every call until released
    struct Gated {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl QueryProcessor for Gated {
        async fn process(&self, query: &str) -> anyhow::Result<String> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(format!("answer to {}", query))
        }
    }

    fn spawn_loop(
        queue: &MemoryJobQueue,
        store: &MemoryStatusStore,
        processor: Arc<dyn QueryProcessor>,
    ) -> tokio::task::JoinHandle<()> {
        let worker = WorkerLoop::new(
            Arc::new(queue.clone()),
            ConnectionSupervisor::new(RetryPolicy::unbounded(
                Duration::from_millis(1),
                Duration::from_millis(5),
            )),
            JobHandler::new(Arc::new(store.clone()), processor),
            "test-worker",
        );
        tokio::spawn(async move { worker.run().await })
    }

    async fn submit(queue: &MemoryJobQueue, store: &MemoryStatusStore, query: &str) -> JobId {
        let job = Job::new(query);
        store.mark_queued(&job.job_id).await.unwrap();
        queue.publish(&codec::encode(&job).unwrap()).await.unwrap();
        job.job_id
    }

    async fn wait_for_result(store: &MemoryStatusStore, id: &JobId) -> String {
        for _ in 0..400 {
            if let Some(result) = store.result(id).await.unwrap() {
                return result;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never completed", id);
    }

    #[tokio::test]
    async fn test_processes_jobs_in_order() {
        let queue = MemoryJobQueue::new();
        let store = MemoryStatusStore::new();
        let worker = spawn_loop(&queue, &store, Arc::new(Echo));

        let first = submit(&queue, &store, "What is Node.js?").await;
        let second = submit(&queue, &store, "Explain event loop").await;

        assert_eq!(
            wait_for_result(&store, &first).await,
            "answer to What is Node.js?"
        );
        assert_eq!(
            wait_for_result(&store, &second).await,
            "answer to Explain event loop"
        );

        worker.abort();
    }

    #[tokio::test]
    async fn test_recovers_after_broker_outage() {
        let queue = MemoryJobQueue::new();
        let store = MemoryStatusStore::new();
        let worker = spawn_loop(&queue, &store, Arc::new(Echo));

        let before = submit(&queue, &store, "before").await;
        wait_for_result(&store, &before).await;

        queue.set_unavailable(true);
        queue.sever();
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.set_unavailable(false);

        let after = submit(&queue, &store, "after").await;
        assert_eq!(wait_for_result(&store, &after).await, "answer to after");
        assert_eq!(
            store.result(&before).await.unwrap().as_deref(),
            Some("answer to before")
        );

        worker.abort();
    }

    #[tokio::test]
    async fn test_in_flight_job_is_redelivered_after_connection_loss() {
        let queue = MemoryJobQueue::new();
        let store = MemoryStatusStore::new();
        let processor = Arc::new(Gated {
            started: Notify::new(),
            release: Notify::new(),
        });
        let worker = spawn_loop(&queue, &store, processor.clone());

        let id = submit(&queue, &store, "X").await;
        processor.started.notified().await;

        // Connection dies while the job is being processed
        queue.sever();
        processor.release.notify_one();

        // First run completes but its ack is refused; the redelivery runs again
        processor.started.notified().await;
        processor.release.notify_one();

        assert_eq!(wait_for_result(&store, &id).await, "answer to X");
        for _ in 0..400 {
            if queue.unacked_len() == 0 && queue.ready_len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(queue.unacked_len(), 0);
        assert_eq!(queue.ready_len(), 0);

        worker.abort();
    }
}
