//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix of the status key namespace in the Status Store
pub const STATUS_KEY_PREFIX: &str = "status_";

/// Unique identifier of a job
///
/// Rendered as a hyphenated UUID string both on the wire and in store keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Mints a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Key holding the job's stored status (`status_<job_id>`)
    pub fn status_key(&self) -> String {
        format!("{}{}", STATUS_KEY_PREFIX, self.0)
    }

    /// Key holding the job's result text (the bare job id)
    pub fn result_key(&self) -> String {
        self.0.to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A unit of work carried end-to-end on the queue
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub query: String,
    /// Absent on messages produced by legacy publishers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Job {
    /// Creates a job for `query` with a freshly minted identifier
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            query: query.into(),
            submitted_at: Some(chrono::Utc::now()),
        }
    }
}

/// Status value persisted under `status_<job_id>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredStatus {
    Queued,
    Completed,
    Failed,
}

impl StoredStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredStatus::Queued => "queued",
            StoredStatus::Completed => "completed",
            StoredStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StoredStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status value is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for StoredStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(StoredStatus::Queued),
            "completed" => Ok(StoredStatus::Completed),
            "failed" => Ok(StoredStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// State of a job as reported to polling clients
///
/// `Pending` is derived: it is reported whenever a status key exists but no
/// result has appeared yet, while the stored value remains `queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Pending,
    Completed,
    Failed,
}

impl JobState {
    /// Whether polling can stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id: JobId = "7f1d3b2a-8c4e-4f7a-9b1e-2d3c4b5a6f70".parse().unwrap();
        assert_eq!(id.status_key(), "status_7f1d3b2a-8c4e-4f7a-9b1e-2d3c4b5a6f70");
        assert_eq!(id.result_key(), "7f1d3b2a-8c4e-4f7a-9b1e-2d3c4b5a6f70");
    }

    #[test]
    fn test_job_ids_are_unique() {
        let ids: std::collections::HashSet<JobId> = (0..1000).map(|_| JobId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_stored_status_parsing() {
        assert_eq!("queued".parse::<StoredStatus>(), Ok(StoredStatus::Queued));
        assert_eq!(
            "completed".parse::<StoredStatus>(),
            Ok(StoredStatus::Completed)
        );
        assert_eq!("failed".parse::<StoredStatus>(), Ok(StoredStatus::Failed));
        assert!("pending".parse::<StoredStatus>().is_err());
    }

    #[test]
    fn test_job_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobState::Pending).unwrap(),
            "\"pending\""
        );
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Pending.is_terminal());
    }
}
