//! API Module
//!
//! HTTP API layer for the gateway.

pub mod error;
pub mod query;

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/query", post(query::submit_query))
        .route("/result/{job_id}", get(query::get_result))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
