//! Ragline Worker
//!
//! A long-running consumer that answers queued queries.
//!
//! Architecture:
//! - Configuration: Load settings from environment
//! - Services: Processing collaborator and per-delivery job handling
//! - Consumer: Supervised queue consumption with reconnection
//!
//! The worker takes one job at a time from the queue, hands the query to the
//! retrieval/generation service, stores the answer and only then
//! acknowledges the message.

mod config;
mod consumer;
mod service;

use anyhow::{Context, Result};
use ragline_infra::queue::AmqpQueueConnector;
use ragline_infra::store::RedisStoreConnector;
use ragline_infra::ConnectionSupervisor;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::consumer::WorkerLoop;
use crate::service::{HttpProcessor, JobHandler, QueryProcessor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragline_worker=info,ragline_infra=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ragline Worker");

    // Load configuration
    let config = Config::from_env().context("Invalid worker configuration")?;
    config.validate()?;
    info!(
        "Loaded configuration: worker_id={}, processor_url={}, queue={}",
        config.worker_id, config.processor_url, config.connections.queue_name
    );

    let supervisor = ConnectionSupervisor::new(config.retry_policy());

    // The store is needed before the first delivery can be settled
    let store_connector = RedisStoreConnector::new(
        config.connections.redis_url.clone(),
        config.result_ttl,
    );
    let store = supervisor
        .acquire_store(&store_connector)
        .await
        .context("Status store unreachable")?;

    let processor: Arc<dyn QueryProcessor> =
        Arc::new(HttpProcessor::new(config.processor_url.clone()));

    let handler = JobHandler::new(store, processor)
        .with_timeout(config.job_timeout)
        .with_failure_policy(config.failure_policy, config.requeue_delay);

    let queue_connector = AmqpQueueConnector::new(
        config.connections.amqp_url.clone(),
        config.connections.queue_name.clone(),
    );

    let worker = WorkerLoop::new(
        Arc::new(queue_connector),
        supervisor,
        handler,
        config.worker_id.clone(),
    );

    info!(
        "Worker initialized: job_timeout={:?}, failure_policy={:?}",
        config.job_timeout, config.failure_policy
    );

    tokio::select! {
        _ = worker.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received, stopping worker");
        }
    }

    Ok(())
}
