//! Gateway configuration
//!
//! Bind address, startup retry policy and store expiry, plus the shared
//! connection settings.

use ragline_infra::config::parse_or;
use ragline_infra::{ConnectionSettings, RetryPolicy};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Store and broker addresses
    pub connections: ConnectionSettings,

    /// Connection attempts per dependency before startup is aborted
    pub connect_max_attempts: u32,

    /// Delay between connection attempts
    pub connect_retry_delay: Duration,

    /// Expiry of the keys written by the gateway, `None` keeps them until read
    pub result_ttl: Option<Duration>,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - GATEWAY_BIND_ADDR (optional, default: 0.0.0.0:8000)
    /// - CONNECT_MAX_ATTEMPTS (optional, default: 10)
    /// - CONNECT_RETRY_DELAY_SECS (optional, default: 5)
    /// - RESULT_TTL_SECS (optional, default: no expiry)
    /// - connection variables, see [`ConnectionSettings::from_env`]
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let connections = ConnectionSettings::from_lookup(&lookup)?;

        let bind_addr = lookup("GATEWAY_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let connect_max_attempts = parse_or(&lookup, "CONNECT_MAX_ATTEMPTS", 10u32)?;
        let connect_retry_delay =
            Duration::from_secs(parse_or(&lookup, "CONNECT_RETRY_DELAY_SECS", 5u64)?);
        let result_ttl = match parse_or(&lookup, "RESULT_TTL_SECS", 0u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            bind_addr,
            connections,
            connect_max_attempts,
            connect_retry_delay,
            result_ttl,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.connect_max_attempts == 0 {
            anyhow::bail!("connect_max_attempts must be greater than 0");
        }

        self.connections.validate()
    }

    /// Startup policy: a dependency still missing after the last attempt is fatal
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::bounded(self.connect_max_attempts, self.connect_retry_delay)
    }

    /// Policy for replacing a lost broker connection while serving
    ///
    /// Kept short: the submitting request waits for it.
    pub fn reconnect_policy(&self) -> RetryPolicy {
        RetryPolicy::bounded(3, Duration::from_millis(500))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            connections: ConnectionSettings::default(),
            connect_max_attempts: 10,
            connect_retry_delay: Duration::from_secs(5),
            result_ttl: None,
        }
    }
}
