//! Queue message codec
//!
//! Jobs travel on the queue as JSON objects:
//!
//! ```text
//! {"job_id":"<uuid>","query":"<text>","submitted_at":"<rfc3339>"}
//! ```
//!
//! The decoder also understands the legacy `job_id|query` frame. Only the
//! first `|` is treated as the delimiter, so queries containing `|` survive.

use crate::domain::job::{Job, JobId};

/// Content type set on published messages
pub const CONTENT_TYPE: &str = "application/json";

/// Delimiter of the legacy frame
pub const LEGACY_DELIMITER: char = '|';

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("message body is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed job message: {0}")]
    Malformed(String),

    #[error("invalid job id {0:?}")]
    InvalidJobId(String),

    #[error("job message carries an empty query")]
    EmptyQuery,

    #[error("failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Serializes a job into a queue message body
pub fn encode(job: &Job) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(job)?)
}

/// Parses a queue message body into a job
pub fn decode(body: &[u8]) -> Result<Job, CodecError> {
    let text = std::str::from_utf8(body)?;

    let job = if text.trim_start().starts_with('{') {
        serde_json::from_str::<Job>(text).map_err(|e| CodecError::Malformed(e.to_string()))?
    } else {
        decode_legacy(text)?
    };

    if job.query.trim().is_empty() {
        return Err(CodecError::EmptyQuery);
    }

    Ok(job)
}

fn decode_legacy(text: &str) -> Result<Job, CodecError> {
    let (id, query) = text.split_once(LEGACY_DELIMITER).ok_or_else(|| {
        CodecError::Malformed(format!("missing '{}' delimiter", LEGACY_DELIMITER))
    })?;

    let job_id: JobId = id
        .parse()
        .map_err(|_| CodecError::InvalidJobId(id.to_string()))?;

    Ok(Job {
        job_id,
        query: query.to_string(),
        submitted_at: None,
    })
}
