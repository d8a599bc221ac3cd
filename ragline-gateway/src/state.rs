//! Application state
//!
//! Connections acquired once at startup and shared by every request handler.

use ragline_infra::{JobQueue, StatusStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StatusStore>,
    pub queue: Arc<dyn JobQueue>,
}

impl AppState {
    pub fn new(store: Arc<dyn StatusStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self { store, queue }
    }
}
