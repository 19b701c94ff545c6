//! Axum route handlers for the Jobs API. Every operation is owner-scoped.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobFields, JobRecord};
use crate::routes::owner::OwnerId;
use crate::routes::{ApiResponse, DeleteResponse};
use crate::state::AppState;
use crate::store::job_not_found;

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> Result<Json<ApiResponse<Vec<JobRecord>>>, AppError> {
    let jobs = state.jobs.list_jobs(owner_id).await?;
    Ok(Json(ApiResponse::ok(jobs)))
}

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(fields): Json<JobFields>,
) -> Result<(StatusCode, Json<ApiResponse<JobRecord>>), AppError> {
    let fields = fields.normalized().map_err(AppError::Validation)?;
    let job = JobRecord::new(owner_id, fields);
    state.jobs.create_job(&job).await?;
    info!("Created job {} ({} at {})", job.id, job.position, job.company);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(job))))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobRecord>>, AppError> {
    let job = state
        .jobs
        .get_job(owner_id, job_id)
        .await?
        .ok_or_else(|| job_not_found(job_id))?;
    Ok(Json(ApiResponse::ok(job)))
}

/// PUT /api/jobs/:id
///
/// Replaces the core fields. Analysis fields are left as they are.
pub async fn handle_update_job(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(job_id): Path<Uuid>,
    Json(fields): Json<JobFields>,
) -> Result<Json<ApiResponse<JobRecord>>, AppError> {
    let fields = fields.normalized().map_err(AppError::Validation)?;
    let job = state
        .jobs
        .update_job(owner_id, job_id, fields)
        .await?
        .ok_or_else(|| job_not_found(job_id))?;
    Ok(Json(ApiResponse::ok(job)))
}

/// DELETE /api/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(job_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.jobs.delete_job(owner_id, job_id).await?;
    Ok(Json(DeleteResponse::new(deleted)))
}
