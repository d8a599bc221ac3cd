//! Job DTOs for the gateway HTTP API

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobId, JobState};

/// Request to submit a new query (`POST /query`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuery {
    pub query: String,
}

/// Rejected request payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("query must not be empty")]
    EmptyQuery,
}

impl SubmitQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    /// Checks field-level constraints before any side effect happens
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(())
    }
}

/// Response to a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobState,
}

impl SubmitResponse {
    pub fn queued(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobState::Queued,
        }
    }
}

/// Response to `GET /result/{job_id}`
///
/// `result` is always serialized, as `null` until the job has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultResponse {
    pub job_id: JobId,
    pub status: JobState,
    #[serde(default)]
    pub result: Option<String>,
}

impl ResultResponse {
    pub fn pending(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobState::Pending,
            result: None,
        }
    }

    pub fn completed(job_id: JobId, result: String) -> Self {
        Self {
            job_id,
            status: JobState::Completed,
            result: Some(result),
        }
    }

    pub fn failed(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobState::Failed,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_query() {
        assert_eq!(
            SubmitQuery::new("").validate(),
            Err(ValidationError::EmptyQuery)
        );
        assert_eq!(
            SubmitQuery::new("  \n\t").validate(),
            Err(ValidationError::EmptyQuery)
        );
        assert!(SubmitQuery::new("What is Node.js?").validate().is_ok());
    }

    #[test]
    fn test_pending_result_serializes_null() {
        let id = JobId::new();
        let json = serde_json::to_value(ResultResponse::pending(id)).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json["result"].is_null());
        assert_eq!(json["job_id"], id.to_string());
    }

    #[test]
    fn test_submit_response_shape() {
        let id = JobId::new();
        let json = serde_json::to_value(SubmitResponse::queued(id)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "job_id": id.to_string(), "status": "queued" })
        );
    }
}
