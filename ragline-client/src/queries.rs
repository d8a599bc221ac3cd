//! Query submission and result retrieval

use std::time::Duration;

use ragline_core::domain::job::JobId;
use ragline_core::dto::job::{ResultResponse, SubmitQuery, SubmitResponse};
use tokio::time::Instant;
use tracing::debug;

use crate::GatewayClient;
use crate::error::{ClientError, Result};

impl GatewayClient {
    // =============================================================================
    // Queries
    // =============================================================================

    /// Submit a query for processing
    ///
    /// # Returns
    /// The job id assigned by the gateway, with status `queued`
    pub async fn submit_query(&self, query: impl Into<String>) -> Result<SubmitResponse> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SubmitQuery::new(query))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Poll a job once
    ///
    /// A `completed` or `failed` answer is only served once; asking again
    /// yields [`ClientError::NotFound`].
    pub async fn fetch_result(&self, job_id: &JobId) -> Result<ResultResponse> {
        let url = format!("{}/result/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        match self.handle_response(response).await {
            Err(ClientError::ApiError { status: 404, .. }) => {
                Err(ClientError::NotFound(job_id.to_string()))
            }
            other => other,
        }
    }

    /// Poll a job until it reaches a terminal state
    ///
    /// # Arguments
    /// * `job_id` - Job returned by [`GatewayClient::submit_query`]
    /// * `poll_interval` - Pause between polls
    /// * `timeout` - Give up after this long with [`ClientError::Timeout`]
    pub async fn wait_for_result(
        &self,
        job_id: &JobId,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<ResultResponse> {
        let started = Instant::now();

        loop {
            let response = self.fetch_result(job_id).await?;
            if response.status.is_terminal() {
                return Ok(response);
            }

            if started.elapsed() + poll_interval > timeout {
                return Err(ClientError::Timeout {
                    job_id: job_id.to_string(),
                    waited: started.elapsed(),
                });
            }

            debug!(job_id = %job_id, status = ?response.status, "Waiting for result");
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use ragline_core::domain::job::JobState;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Polls remaining before each job completes
    type Jobs = Arc<Mutex<HashMap<JobId, u32>>>;

    async fn submit(
        State(jobs): State<Jobs>,
        Json(req): Json<SubmitQuery>,
    ) -> std::result::Result<Json<SubmitResponse>, (StatusCode, Json<serde_json::Value>)> {
        if req.query.trim().is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "query must not be empty" })),
            ));
        }
        let id = JobId::new();
        jobs.lock().unwrap().insert(id, 2);
        Ok(Json(SubmitResponse::queued(id)))
    }

    async fn result(
        State(jobs): State<Jobs>,
        Path(id): Path<String>,
    ) -> std::result::Result<Json<ResultResponse>, StatusCode> {
        let id: JobId = id.parse().map_err(|_| StatusCode::NOT_FOUND)?;
        let mut jobs = jobs.lock().unwrap();
        match jobs.get_mut(&id) {
            None => Err(StatusCode::NOT_FOUND),
            Some(0) => {
                jobs.remove(&id);
                Ok(Json(ResultResponse::completed(id, "42".to_string())))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(Json(ResultResponse::pending(id)))
            }
        }
    }

    async fn spawn_gateway() -> GatewayClient {
        let jobs: Jobs = Arc::default();
        let app = Router::new()
            .route("/query", post(submit))
            .route("/result/{job_id}", get(result))
            .with_state(jobs);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        GatewayClient::new(format!("http://{}/", addr))
    }

    #[tokio::test]
    async fn test_submit_and_wait() {
        let client = spawn_gateway().await;

        let submitted = client.submit_query("What is Node.js?").await.unwrap();
        assert_eq!(submitted.status, JobState::Queued);

        let answer = client
            .wait_for_result(
                &submitted.job_id,
                Duration::from_millis(5),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(answer.status, JobState::Completed);
        assert_eq!(answer.result.as_deref(), Some("42"));

        let err = client.fetch_result(&submitted.job_id).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let client = spawn_gateway().await;
        let submitted = client.submit_query("slow").await.unwrap();

        let err = client
            .wait_for_result(&submitted.job_id, Duration::from_millis(50), Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_error_body_is_unwrapped() {
        let client = spawn_gateway().await;

        let err = client.submit_query("  ").await.unwrap_err();

        match err {
            ClientError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "query must not be empty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
