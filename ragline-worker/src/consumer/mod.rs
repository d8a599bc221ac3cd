//! Consumer layer for the worker
//!
//! Keeps a consumer attached to the job queue and feeds deliveries to the
//! job handler one at a time, reconnecting whenever the broker goes away.

pub mod worker_loop;

pub use worker_loop::WorkerLoop;
