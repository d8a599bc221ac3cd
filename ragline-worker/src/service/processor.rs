//! Processing collaborator
//!
//! The retrieval and generation pipeline is an external service; the worker
//! only needs `query -> text`, possibly slow, possibly failing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Turns a query into answer text
#[async_trait]
pub trait QueryProcessor: Send + Sync {
    async fn process(&self, query: &str) -> Result<String>;
}

/// Calls the retrieval/generation service over HTTP
///
/// Request: `POST <endpoint>` with `{"query": "..."}`.
/// Response: `{"answer": "..."}`.
pub struct HttpProcessor {
    client: Client,
    endpoint: String,
}

impl HttpProcessor {
    /// Creates a new HTTP processor
    ///
    /// # Arguments
    /// * `endpoint` - Full URL of the processing endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    answer: String,
}

#[async_trait]
impl QueryProcessor for HttpProcessor {
    async fn process(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProcessRequest { query })
            .send()
            .await
            .context("Failed to reach processor")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Processor returned {} - {}", status, body);
        }

        let parsed = response
            .json::<ProcessResponse>()
            .await
            .context("Failed to parse processor response")?;

        Ok(parsed.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(ProcessRequest { query: "hi" }).unwrap();
        assert_eq!(json, serde_json::json!({ "query": "hi" }));
    }

    #[test]
    fn test_response_parsing() {
        let parsed: ProcessResponse =
            serde_json::from_str(r#"{"answer": "see page 4", "sources": []}"#).unwrap();
        assert_eq!(parsed.answer, "see page 4");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let processor = HttpProcessor::new("http://127.0.0.1:9/process");
        assert!(processor.process("hello").await.is_err());
    }
}
