//! Application state for the API server

use crate::{Config, Repackager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone, Debug)]
pub struct AppState {
    /// Conversion pipeline
    pub repackager: Arc<Repackager>,

    /// Configuration, read only
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(repackager: Arc<Repackager>, config: Arc<Config>) -> Self {
        Self { repackager, config }
    }
}
