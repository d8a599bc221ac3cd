//! Worker configuration
//!
//! Defines all configurable parameters for the worker including the
//! processing endpoint, failure handling and reconnection backoff.

use ragline_infra::config::parse_or;
use ragline_infra::{ConnectionSettings, RetryPolicy};
use std::time::Duration;

use crate::service::FailurePolicy;

/// Worker configuration
///
/// Timeouts and delays are configurable to allow tuning for different
/// deployment scenarios (dev vs prod, fast vs slow processors).
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique identifier for this worker instance, used as the consumer tag
    pub worker_id: String,

    /// Store and broker addresses
    pub connections: ConnectionSettings,

    /// Endpoint of the retrieval/generation service
    pub processor_url: String,

    /// Maximum time a single job may take, `None` waits indefinitely
    pub job_timeout: Option<Duration>,

    /// What to do with a job whose processing failed
    pub failure_policy: FailurePolicy,

    /// Pause before a failed job is handed back to the broker
    pub requeue_delay: Duration,

    /// First reconnection delay, doubled after each failed attempt
    pub reconnect_initial_delay: Duration,

    /// Upper bound of the reconnection delay
    pub reconnect_max_delay: Duration,

    /// Expiry of the result and status keys written by the worker
    pub result_ttl: Option<Duration>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(worker_id: String, processor_url: String) -> Self {
        Self {
            worker_id,
            connections: ConnectionSettings::default(),
            processor_url,
            job_timeout: Some(Duration::from_secs(300)), // 5 minutes
            failure_policy: FailurePolicy::Requeue,
            requeue_delay: Duration::from_millis(1000),
            reconnect_initial_delay: Duration::from_secs(5),
            reconnect_max_delay: Duration::from_secs(60),
            result_ttl: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PROCESSOR_URL (required)
    /// - WORKER_ID (optional, default: random)
    /// - JOB_TIMEOUT_SECS (optional, default: 300, 0 disables the limit)
    /// - FAILURE_POLICY (optional, `requeue` or `mark-failed`, default: requeue)
    /// - REQUEUE_DELAY_MS (optional, default: 1000)
    /// - RECONNECT_INITIAL_DELAY_SECS (optional, default: 5)
    /// - RECONNECT_MAX_DELAY_SECS (optional, default: 60)
    /// - RESULT_TTL_SECS (optional, default: no expiry)
    /// - connection variables, see [`ConnectionSettings::from_env`]
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let processor_url = lookup("PROCESSOR_URL")
            .ok_or_else(|| anyhow::anyhow!("PROCESSOR_URL environment variable not set"))?;

        let worker_id =
            lookup("WORKER_ID").unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()));

        let mut config = Self::new(worker_id, processor_url);
        config.connections = ConnectionSettings::from_lookup(&lookup)?;

        config.job_timeout = match parse_or(&lookup, "JOB_TIMEOUT_SECS", 300u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        config.failure_policy = parse_or(&lookup, "FAILURE_POLICY", FailurePolicy::Requeue)?;
        config.requeue_delay =
            Duration::from_millis(parse_or(&lookup, "REQUEUE_DELAY_MS", 1000u64)?);
        config.reconnect_initial_delay =
            Duration::from_secs(parse_or(&lookup, "RECONNECT_INITIAL_DELAY_SECS", 5u64)?);
        config.reconnect_max_delay =
            Duration::from_secs(parse_or(&lookup, "RECONNECT_MAX_DELAY_SECS", 60u64)?);
        config.result_ttl = match parse_or(&lookup, "RESULT_TTL_SECS", 0u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_id.is_empty() {
            anyhow::bail!("worker_id cannot be empty");
        }

        if !self.processor_url.starts_with("http://") && !self.processor_url.starts_with("https://")
        {
            anyhow::bail!("processor_url must start with http:// or https://");
        }

        if self.reconnect_initial_delay.is_zero() {
            anyhow::bail!("reconnect_initial_delay must be greater than 0");
        }

        if self.reconnect_max_delay < self.reconnect_initial_delay {
            anyhow::bail!("reconnect_max_delay must not be below reconnect_initial_delay");
        }

        self.connections.validate()
    }

    /// Reconnection policy: the worker never gives up on its dependencies
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::unbounded(self.reconnect_initial_delay, self.reconnect_max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_with(
        pairs: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::new("worker-1".to_string(), "http://localhost:9000".to_string());
        assert_eq!(config.job_timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.failure_policy, FailurePolicy::Requeue);
        assert_eq!(config.requeue_delay, Duration::from_millis(1000));
        assert_eq!(config.reconnect_initial_delay, Duration::from_secs(5));
        assert_eq!(config.reconnect_max_delay, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_processor_url_is_required() {
        let err = Config::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains("PROCESSOR_URL"));
    }

    #[test]
    fn test_worker_id_generated_when_missing() {
        let config = Config::from_lookup(lookup_with(&[("PROCESSOR_URL", "http://rag:9000")]))
            .unwrap();
        assert!(config.worker_id.starts_with("worker-"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_with(&[
            ("PROCESSOR_URL", "http://rag:9000/process"),
            ("WORKER_ID", "w-7"),
            ("JOB_TIMEOUT_SECS", "0"),
            ("FAILURE_POLICY", "mark-failed"),
            ("REQUEUE_DELAY_MS", "250"),
            ("RECONNECT_MAX_DELAY_SECS", "30"),
            ("RESULT_TTL_SECS", "600"),
        ]))
        .unwrap();

        assert_eq!(config.worker_id, "w-7");
        assert_eq!(config.job_timeout, None);
        assert_eq!(config.failure_policy, FailurePolicy::MarkFailed);
        assert_eq!(config.requeue_delay, Duration::from_millis(250));
        assert_eq!(config.result_ttl, Some(Duration::from_secs(600)));

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_unknown_failure_policy_is_rejected() {
        let result = Config::from_lookup(lookup_with(&[
            ("PROCESSOR_URL", "http://rag:9000"),
            ("FAILURE_POLICY", "retry-forever"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("worker-1".to_string(), "http://localhost:9000".to_string());
        assert!(config.validate().is_ok());

        config.processor_url = "localhost:9000".to_string();
        assert!(config.validate().is_err());

        config.processor_url = "https://rag.internal".to_string();
        config.reconnect_max_delay = Duration::from_secs(1);
        assert!(config.validate().is_err());

        config.reconnect_max_delay = Duration::from_secs(60);
        config.worker_id = String::new();
        assert!(config.validate().is_err());
    }
}
