//! Job Service
//!
//! Submission and one-shot result retrieval.

use ragline_core::codec;
use ragline_core::domain::job::{Job, JobId, StoredStatus};
use ragline_core::dto::job::{ResultResponse, SubmitQuery, SubmitResponse, ValidationError};
use ragline_infra::{QueueError, StoreError};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to encode job: {0}")]
    Encode(#[from] codec::CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Accept a query and hand it to the workers
///
/// The status key is written before the message is published, so a job is
/// visible as `pending` from the moment the caller gets its id. If the
/// publish fails the status key is removed again.
pub async fn submit(state: &AppState, req: SubmitQuery) -> Result<SubmitResponse, JobError> {
    req.validate()?;

    let job = Job::new(req.query);
    let body = codec::encode(&job)?;

    state.store.mark_queued(&job.job_id).await?;

    if let Err(e) = state.queue.publish(&body).await {
        warn!(job_id = %job.job_id, "Failed to enqueue job: {}", e);
        if let Err(cleanup) = state.store.retire(&job.job_id).await {
            warn!(
                job_id = %job.job_id,
                "Failed to remove status of unqueued job: {}", cleanup
            );
        }
        return Err(e.into());
    }

    info!(job_id = %job.job_id, "Job queued");

    Ok(SubmitResponse::queued(job.job_id))
}

/// Look up a job and serve its result at most once
///
/// - Unknown (or already retrieved) id: `NotFound`
/// - Result present: `completed`, and the status key is deleted
/// - Marked failed: `failed`, and the status key is deleted
/// - Otherwise: `pending`
pub async fn fetch_result(state: &AppState, job_id: &str) -> Result<ResultResponse, JobError> {
    let id: JobId = job_id
        .parse()
        .map_err(|_| JobError::NotFound(job_id.to_string()))?;

    let status = state
        .store
        .status(&id)
        .await?
        .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

    if let Some(result) = state.store.result(&id).await? {
        claim_terminal(state, &id).await?;
        info!(job_id = %id, "Served completed result");
        return Ok(ResultResponse::completed(id, result));
    }

    if status == StoredStatus::Failed {
        claim_terminal(state, &id).await?;
        info!(job_id = %id, "Served failed job");
        return Ok(ResultResponse::failed(id));
    }

    debug!(job_id = %id, stored = %status, "Job still pending");

    Ok(ResultResponse::pending(id))
}

/// Only the reader whose delete removed the status key serves the terminal
/// state; a concurrent reader that lost the race sees `NotFound`.
async fn claim_terminal(state: &AppState, id: &JobId) -> Result<(), JobError> {
    if state.store.retire(id).await? {
        Ok(())
    } else {
        debug!(job_id = %id, "Terminal state already served to another reader");
        Err(JobError::NotFound(id.to_string()))
    }
}
