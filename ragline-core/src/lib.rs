//! Ragline Core
//!
//! Core types and abstractions for the Ragline query pipeline.
//!
//! This crate contains:
//! - Domain types: Jobs, their stored status and the client-facing state
//! - DTOs: Request/response payloads of the gateway HTTP API
//! - Codec: The wire format of job messages on the queue

pub mod codec;
pub mod domain;
pub mod dto;
