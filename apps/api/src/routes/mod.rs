pub mod health;
pub mod owner;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::analysis::handlers as analysis;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn new(deleted: bool) -> Self {
        Self {
            success: true,
            deleted,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/resume", get(analysis::handle_history))
        .route("/api/resume/analyze", post(analysis::handle_analyze_resume))
        .route("/api/resume/analyze-job", post(analysis::handle_analyze_job))
        .route(
            "/api/resume/:id",
            get(analysis::handle_get_analysis).delete(analysis::handle_delete_analysis),
        )
        // Jobs API
        .route(
            "/api/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route(
            "/api/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .with_state(state)
}
