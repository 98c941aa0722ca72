use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub config: Config,
    /// Each search launches its own browser; this bounds how many run at once.
    pub search_slots: Arc<Semaphore>,
}
