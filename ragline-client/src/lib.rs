//! Ragline HTTP Client
//!
//! A small, type-safe client for the Ragline gateway API. Used by the CLI and
//! by anything else that wants to submit queries and collect answers.
//!
//! # Example
//!
//! ```no_run
//! use ragline_client::GatewayClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ragline_client::ClientError> {
//!     let client = GatewayClient::new("http://localhost:8000");
//!
//!     let submitted = client.submit_query("What is Node.js?").await?;
//!     let answer = client
//!         .wait_for_result(&submitted.job_id, Duration::from_secs(1), Duration::from_secs(60))
//!         .await?;
//!
//!     println!("{:?}", answer.result);
//!     Ok(())
//! }
//! ```

pub mod error;
mod queries;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use ragline_core::dto::job::{ResultResponse, SubmitResponse};

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// HTTP client for the Ragline gateway
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// Base URL of the gateway (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

/// Error body produced by the gateway
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl GatewayClient {
    /// Create a new gateway client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the gateway (e.g., "http://localhost:8000")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new gateway client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    ///
    /// Error bodies of the form `{"error": "..."}` are unwrapped into the
    /// error message.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);
            return Err(ClientError::api_error(status.as_u16(), message));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GatewayClient::new("http://localhost:8000");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GatewayClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
