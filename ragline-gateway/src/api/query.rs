//! Query API Handlers
//!
//! HTTP endpoints for submitting queries and polling their results.

use axum::{
    Json,
    extract::{Path, State},
};
use ragline_core::dto::job::{ResultResponse, SubmitQuery, SubmitResponse};

use crate::api::error::ApiResult;
use crate::service::job_service;
use crate::state::AppState;

/// POST /query
/// Queue a query for asynchronous processing
pub async fn submit_query(
    State(state): State<AppState>,
    Json(req): Json<SubmitQuery>,
) -> ApiResult<Json<SubmitResponse>> {
    tracing::debug!("Submitting query ({} bytes)", req.query.len());

    let response = job_service::submit(&state, req).await?;

    Ok(Json(response))
}

/// GET /result/{job_id}
/// Poll for the result of a job; a completed result is served only once
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ResultResponse>> {
    tracing::debug!("Fetching result for job: {}", job_id);

    let response = job_service::fetch_result(&state, &job_id).await?;

    Ok(Json(response))
}
