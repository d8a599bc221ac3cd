//! Service Module
//!
//! Business logic layer for the gateway.
//! Services orchestrate between the Status Store and the Job Queue.

pub mod job;

// Re-export for convenience
pub use job as job_service;
