//! Connection supervisor
//!
//! Single acquisition point for the Status Store and the Job Queue. Every
//! attempt is logged; the retry policy decides whether to give up.
//!
//! The gateway uses a bounded policy (a dependency missing at startup is
//! fatal), the worker an unbounded one (it outlives infrastructure outages).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::queue::{JobQueue, QueueConnector};
use crate::store::{StatusStore, StoreConnector};

/// Attempts and delays for connection establishment
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// `None` retries forever
    pub max_attempts: Option<u32>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor of the delay between attempts (1.0 = fixed delay)
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Fixed delay, gives up after `max_attempts`
    pub fn bounded(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Exponential backoff with a cap, never gives up
    pub fn unbounded(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            multiplier: 2.0,
        }
    }

    /// Delay to wait after an attempt that waited `current`
    pub fn next_delay(&self, current: Duration) -> Duration {
        if self.multiplier <= 1.0 {
            return current.min(self.max_delay);
        }
        let next = current.as_secs_f64() * self.multiplier;
        if next >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(next)
        }
    }
}

impl Default for RetryPolicy {
    /// 10 attempts, 5 seconds apart
    fn default() -> Self {
        Self::bounded(10, Duration::from_secs(5))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to connect to {target} after {attempts} attempt(s): {last_error}")]
    Exhausted {
        target: String,
        attempts: u32,
        last_error: String,
    },
}

/// Acquires connections according to a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct ConnectionSupervisor {
    policy: RetryPolicy,
}

impl ConnectionSupervisor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Acquires the Status Store
    pub async fn acquire_store(
        &self,
        connector: &dyn StoreConnector,
    ) -> Result<Arc<dyn StatusStore>, SupervisorError> {
        let target = connector.target();
        self.acquire(&target, || connector.connect()).await
    }

    /// Acquires the Job Queue; the durable queue exists once this returns
    pub async fn acquire_queue(
        &self,
        connector: &dyn QueueConnector,
    ) -> Result<Arc<dyn JobQueue>, SupervisorError> {
        let target = connector.target();
        self.acquire(&target, || connector.connect()).await
    }

    /// Runs `connect` until it succeeds or the policy is exhausted
    ///
    /// # Arguments
    /// * `target` - Human readable name of the dependency, used in logs
    /// * `connect` - Produces one connection attempt per call
    pub async fn acquire<T, E, F, Fut>(
        &self,
        target: &str,
        mut connect: F,
    ) -> Result<T, SupervisorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt: u32 = 0;
        let mut delay = self.policy.initial_delay;

        loop {
            attempt += 1;

            match connect().await {
                Ok(connection) => {
                    if attempt > 1 {
                        info!(
                            dependency = %target,
                            attempt,
                            "Connected to {} after {} attempt(s)",
                            target,
                            attempt
                        );
                    } else {
                        info!(dependency = %target, "Connected to {}", target);
                    }
                    return Ok(connection);
                }
                Err(e) => {
                    if let Some(max) = self.policy.max_attempts {
                        if attempt >= max {
                            error!(
                                dependency = %target,
                                attempt,
                                max_attempts = max,
                                "Giving up on {}: {}",
                                target,
                                e
                            );
                            return Err(SupervisorError::Exhausted {
                                target: target.to_string(),
                                attempts: attempt,
                                last_error: e.to_string(),
                            });
                        }
                    }

                    warn!(
                        dependency = %target,
                        attempt,
                        max_attempts = ?self.policy.max_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        "Connection attempt to {} failed: {}",
                        target,
                        e
                    );

                    tokio::time::sleep(delay).await;
                    delay = self.policy.next_delay(delay);
                }
            }
        }
    }
}
