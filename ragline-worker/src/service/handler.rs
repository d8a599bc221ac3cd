//! Job handler
//!
//! Settles one delivery: decode, process, persist, then acknowledge. The
//! acknowledgment is always the last step, so a crash at any earlier point
//! leaves the message on the queue for redelivery.

use ragline_core::codec;
use ragline_core::domain::job::{Job, JobId};
use ragline_infra::{Delivery, QueueError, StatusStore, StoreError};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::processor::QueryProcessor;

/// What happens to a job whose processing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Return the message to the queue after a delay
    #[default]
    Requeue,
    /// Record the job as failed and acknowledge the message
    MarkFailed,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "requeue" => Ok(Self::Requeue),
            "mark-failed" | "mark_failed" => Ok(Self::MarkFailed),
            other => Err(format!(
                "unknown failure policy '{}', expected 'requeue' or 'mark-failed'",
                other
            )),
        }
    }
}

/// How a delivery was settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(JobId),
    Requeued(JobId),
    Failed(JobId),
    /// Undecodable message, rejected without requeue
    Rejected,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("processor failed: {0:#}")]
    Processor(anyhow::Error),

    #[error("processing exceeded {0:?}")]
    Timeout(Duration),

    #[error("failed to store result: {0}")]
    Store(#[from] StoreError),
}

pub struct JobHandler {
    store: Arc<dyn StatusStore>,
    processor: Arc<dyn QueryProcessor>,
    job_timeout: Option<Duration>,
    failure_policy: FailurePolicy,
    requeue_delay: Duration,
}

impl JobHandler {
    pub fn new(store: Arc<dyn StatusStore>, processor: Arc<dyn QueryProcessor>) -> Self {
        Self {
            store,
            processor,
            job_timeout: None,
            failure_policy: FailurePolicy::Requeue,
            requeue_delay: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, job_timeout: Option<Duration>) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy, requeue_delay: Duration) -> Self {
        self.failure_policy = policy;
        self.requeue_delay = requeue_delay;
        self
    }

    /// Processes and settles a single delivery
    ///
    /// Errors are broker errors raised while settling; the message is then
    /// still unacknowledged and the broker redelivers it once the connection
    /// is gone.
    pub async fn handle(&self, delivery: Delivery) -> Result<Outcome, QueueError> {
        let job = match codec::decode(&delivery.body) {
            Ok(job) => job,
            Err(e) => {
                error!(
                    len = delivery.body.len(),
                    "Rejecting undecodable message: {}", e
                );
                delivery.nack(false).await?;
                return Ok(Outcome::Rejected);
            }
        };

        let queue_wait_ms = job
            .submitted_at
            .map(|at| (chrono::Utc::now() - at).num_milliseconds());
        info!(
            job_id = %job.job_id,
            redelivered = delivery.redelivered,
            queue_wait_ms,
            "Processing query"
        );

        match self.process(&job).await {
            Ok(()) => {
                delivery.ack().await?;
                info!(job_id = %job.job_id, "Job completed");
                Ok(Outcome::Completed(job.job_id))
            }
            Err(e) => {
                warn!(job_id = %job.job_id, "Job failed: {}", e);
                self.settle_failure(job.job_id, delivery).await
            }
        }
    }

    async fn process(&self, job: &Job) -> Result<(), ProcessError> {
        let answer = self.run_processor(&job.query).await?;
        self.store.complete(&job.job_id, &answer).await?;
        Ok(())
    }

    /// Dropping the processor future on timeout cancels the call
    async fn run_processor(&self, query: &str) -> Result<String, ProcessError> {
        let call = self.processor.process(query);

        let result = match self.job_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ProcessError::Timeout(limit))?,
            None => call.await,
        };

        result.map_err(ProcessError::Processor)
    }

    async fn settle_failure(
        &self,
        job_id: JobId,
        delivery: Delivery,
    ) -> Result<Outcome, QueueError> {
        if self.failure_policy == FailurePolicy::MarkFailed {
            match self.store.mark_failed(&job_id).await {
                Ok(()) => {
                    delivery.ack().await?;
                    info!(job_id = %job_id, "Job marked as failed");
                    return Ok(Outcome::Failed(job_id));
                }
                Err(e) => {
                    warn!(job_id = %job_id, "Failed to mark job as failed: {}", e);
                }
            }
        }

        if !self.requeue_delay.is_zero() {
            tokio::time::sleep(self.requeue_delay).await;
        }
        delivery.nack(true).await?;
        info!(job_id = %job_id, "Job requeued");

        Ok(Outcome::Requeued(job_id))
    }
}
