use std::sync::Arc;

use crate::analysis::pipeline::Pipeline;
use crate::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the analysis store, the provider gateway and the single-flight guard.
    pub pipeline: Pipeline,
    /// Same backend as the pipeline's analysis store, viewed through the jobs seam.
    pub jobs: Arc<dyn JobStore>,
}
