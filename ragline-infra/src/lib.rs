//! Ragline Infrastructure
//!
//! Connections to the two external dependencies of the pipeline:
//! - Status Store: transient job status and result records (Redis)
//! - Job Queue: durable, at-least-once delivery of jobs (RabbitMQ)
//!
//! Both are reached through async traits so the gateway and the worker can be
//! wired against the in-memory back ends in tests. Connections are acquired
//! through the [`supervisor::ConnectionSupervisor`], which owns the retry policy.

pub mod config;
pub mod queue;
pub mod store;
pub mod supervisor;

pub use config::ConnectionSettings;
pub use queue::{Delivery, JobConsumer, JobQueue, QueueConnector, QueueError};
pub use store::{StatusStore, StoreConnector, StoreError};
pub use supervisor::{ConnectionSupervisor, RetryPolicy, SupervisorError};
