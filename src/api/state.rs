//! Application state for the API server

use crate::{BundleEngine, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the engine instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main BundleEngine instance
    pub engine: Arc<BundleEngine>,

    /// Configuration (read access)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(engine: Arc<BundleEngine>, config: Arc<Config>) -> Self {
        Self { engine, config }
    }
}
