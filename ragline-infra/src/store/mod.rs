//! Status Store
//!
//! Key-value records of job status and job result. Layout:
//! - `status_<job_id>` → `"queued"` | `"completed"` | `"failed"`
//! - `<job_id>` → result text
//!
//! Single writer per transition: the gateway writes `queued` and retires the
//! status key after serving a terminal read; the worker writes the outcome.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use ragline_core::domain::job::{JobId, StoredStatus, UnknownStatus};
use std::sync::Arc;

pub use self::memory::MemoryStatusStore;
pub use self::redis::{RedisStatusStore, RedisStoreConnector};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("status store unavailable: {0}")]
    Connection(String),

    #[error("status store command failed: {0}")]
    Command(String),

    #[error("corrupt status record for job {job_id}: {source}")]
    Corrupt {
        job_id: JobId,
        #[source]
        source: UnknownStatus,
    },
}

/// Access to job status and result records
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Records a freshly submitted job (`status_<id> = queued`)
    async fn mark_queued(&self, job_id: &JobId) -> Result<(), StoreError>;

    /// Reads the stored status, `None` when the job is unknown or retired
    async fn status(&self, job_id: &JobId) -> Result<Option<StoredStatus>, StoreError>;

    /// Reads the result text, `None` until the job has completed
    async fn result(&self, job_id: &JobId) -> Result<Option<String>, StoreError>;

    /// Writes the result and `status_<id> = completed` as one operation
    ///
    /// Overwriting is harmless, so redelivered jobs may complete twice.
    async fn complete(&self, job_id: &JobId, result: &str) -> Result<(), StoreError>;

    /// Records a terminal failure (`status_<id> = failed`)
    async fn mark_failed(&self, job_id: &JobId) -> Result<(), StoreError>;

    /// Deletes the status key once a terminal state has been served
    ///
    /// Returns `true` only for the caller whose delete removed the key, so
    /// concurrent readers can agree on who serves the terminal state.
    async fn retire(&self, job_id: &JobId) -> Result<bool, StoreError>;
}

/// Produces Status Store connections for the supervisor
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Name of the dependency as it appears in logs
    fn target(&self) -> String;

    async fn connect(&self) -> Result<Arc<dyn StatusStore>, StoreError>;
}

pub(crate) fn parse_status(
    job_id: &JobId,
    raw: Option<String>,
) -> Result<Option<StoredStatus>, StoreError> {
    raw.map(|value| {
        value
            .parse::<StoredStatus>()
            .map_err(|source| StoreError::Corrupt {
                job_id: *job_id,
                source,
            })
    })
    .transpose()
}
