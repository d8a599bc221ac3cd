//! Service layer
//!
//! Services contain business logic for the worker: the processing
//! collaborator seam and the per-delivery job handler.
//!
//! The collaborator is trait-based to enable testing and dependency injection.

mod handler;
mod processor;

pub use handler::{FailurePolicy, JobHandler, Outcome};
pub use processor::{HttpProcessor, QueryProcessor};
