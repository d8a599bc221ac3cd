//! Ragline Gateway
//!
//! HTTP submission service: accepts queries, records their status and
//! enqueues them for the workers, then serves results to polling clients.
//!
//! The Status Store and the Job Queue are acquired once at startup. If either
//! stays unreachable for the configured number of attempts the process exits
//! with an error instead of serving requests. A broker connection lost later
//! is replaced on the next publish.

use anyhow::{Context, Result};
use ragline_infra::queue::{AmqpQueueConnector, ReconnectingQueue};
use ragline_infra::store::RedisStoreConnector;
use ragline_infra::{ConnectionSupervisor, QueueConnector, StoreConnector};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod service;
pub mod state;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragline_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ragline Gateway...");

    let config = Config::from_env().context("Invalid gateway configuration")?;
    config.validate()?;

    let supervisor = ConnectionSupervisor::new(config.retry_policy());
    let store_connector = RedisStoreConnector::new(
        config.connections.redis_url.clone(),
        config.result_ttl,
    );
    let queue_connector = Arc::new(AmqpQueueConnector::new(
        config.connections.amqp_url.clone(),
        config.connections.queue_name.clone(),
    ));
    let reconnect = ConnectionSupervisor::new(config.reconnect_policy());

    let state = acquire_state(&supervisor, &store_connector, queue_connector, reconnect).await?;
    let queue = state.queue.clone();

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Closing broker connection");
    if let Err(e) = queue.close().await {
        tracing::warn!("Failed to close broker connection: {}", e);
    }

    Ok(())
}

/// Acquire both dependencies; exhaustion of either is fatal
///
/// The queue is wrapped so that later connection losses are repaired with
/// the `reconnect` policy instead of failing every submission.
async fn acquire_state(
    supervisor: &ConnectionSupervisor,
    store_connector: &dyn StoreConnector,
    queue_connector: Arc<dyn QueueConnector>,
    reconnect: ConnectionSupervisor,
) -> Result<AppState> {
    let store = supervisor
        .acquire_store(store_connector)
        .await
        .context("Status store unreachable")?;

    let initial = supervisor
        .acquire_queue(queue_connector.as_ref())
        .await
        .context("Job queue unreachable")?;
    let queue = ReconnectingQueue::new(queue_connector, reconnect, initial);

    Ok(AppState::new(store, Arc::new(queue)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
