// Application state module
// Everything a connection needs to serve requests, built once at startup

use std::sync::Arc;
use std::time::Duration;

use super::types::Config;
use crate::pipeline::{MemoryStore, Pipeline, RateLimitStore};
use crate::resources::DocumentStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub pipeline: Pipeline,
    pub documents: Arc<DocumentStore>,
    /// Shared with the pipeline's rate limiter and the expiry sweeper
    pub rate_limits: Arc<dyn RateLimitStore>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let documents = Arc::new(DocumentStore::new());
        let rate_limits: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new(
            Duration::from_secs(config.rate_limit.window_secs),
        ));
        let pipeline =
            Pipeline::from_config(config, Arc::clone(&documents), Arc::clone(&rate_limits));

        Self {
            config: config.clone(),
            pipeline,
            documents,
            rate_limits,
        }
    }
}
