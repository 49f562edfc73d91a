use std::sync::Arc;

use crate::config::Config;
use crate::embedding::BatchEmbedder;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable embedding backend. Default: `RemoteEmbedder`.
    pub embedder: Arc<dyn BatchEmbedder>,
}
