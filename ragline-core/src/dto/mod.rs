//! Data Transfer Objects for the gateway HTTP API
//!
//! Request payloads validate themselves at the boundary; response payloads
//! carry only typed fields.

pub mod job;
