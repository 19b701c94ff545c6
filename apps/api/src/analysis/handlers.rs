//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::pipeline::JobAnalysis;
use crate::errors::AppError;
use crate::models::analysis::{AnalysisResult, AnalysisSummary};
use crate::routes::owner::OwnerId;
use crate::routes::{ApiResponse, DeleteResponse};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Missing text deserializes as empty so validation reports it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResumeRequest {
    #[serde(default)]
    pub resume_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeJobRequest {
    #[serde(default)]
    pub job_description: String,
    pub job_id: Option<Uuid>,
    #[serde(default)]
    pub resume_text: String,
}

/// A job result plus the legacy `matchScore` alias of `compatibilityScore`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResultView {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub match_score: u8,
}

impl From<AnalysisResult> for JobResultView {
    fn from(result: AnalysisResult) -> Self {
        let match_score = result
            .job
            .as_ref()
            .map(|job| job.compatibility_score)
            .unwrap_or_default();
        Self {
            result,
            match_score,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAnalysisResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JobResultView>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insufficient_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

const INSUFFICIENT_CONTENT_MESSAGE: &str =
    "Job description is too short to analyze. Add more detail and try again.";

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/resume/analyze
///
/// Scores a résumé on its own and stores the result.
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<AnalyzeResumeRequest>,
) -> Result<Json<ApiResponse<AnalysisResult>>, AppError> {
    let result = state
        .pipeline
        .analyze_resume(owner_id, &request.resume_text)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// POST /api/resume/analyze-job
///
/// Scores a résumé against a job description and merges the job fields into
/// the job record. A too-short description is reported in-band with 200.
pub async fn handle_analyze_job(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<AnalyzeJobRequest>,
) -> Result<Json<JobAnalysisResponse>, AppError> {
    let job_id = request
        .job_id
        .ok_or_else(|| AppError::Validation("jobId is required".to_string()))?;

    let outcome = state
        .pipeline
        .analyze_job(
            owner_id,
            job_id,
            &request.job_description,
            &request.resume_text,
        )
        .await?;

    let response = match outcome {
        JobAnalysis::Completed(result) => JobAnalysisResponse {
            success: true,
            data: Some(result.into()),
            insufficient_content: false,
            message: None,
        },
        JobAnalysis::InsufficientContent => JobAnalysisResponse {
            success: false,
            data: None,
            insufficient_content: true,
            message: Some(INSUFFICIENT_CONTENT_MESSAGE.to_string()),
        },
    };
    Ok(Json(response))
}

/// GET /api/resume
///
/// The caller's analyses, newest first.
pub async fn handle_history(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> Result<Json<ApiResponse<Vec<AnalysisSummary>>>, AppError> {
    let history = state.pipeline.history(owner_id).await?;
    Ok(Json(ApiResponse::ok(history)))
}

/// GET /api/resume/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AnalysisResult>>, AppError> {
    let result = state.pipeline.get(owner_id, id).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// DELETE /api/resume/:id
///
/// Unknown or foreign ids succeed with `deleted: false`.
pub async fn handle_delete_analysis(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.pipeline.delete(owner_id, id).await?;
    Ok(Json(DeleteResponse::new(deleted)))
}
