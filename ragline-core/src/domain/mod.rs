//! Core domain types
//!
//! These types are shared between the gateway (which creates and reads jobs)
//! and the worker (which processes them).

pub mod job;
