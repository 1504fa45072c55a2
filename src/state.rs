//! Shared application state.

use crate::config::Config;
use std::sync::Arc;

/// Shared application state. The configuration is immutable, so a plain
/// `Arc` is all the handlers need.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}
