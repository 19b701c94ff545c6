//! Pipeline Orchestrator — runs one analysis end to end.
//!
//! Flow: validate → single-flight guard → compose → (job ownership check) →
//!       provider call → parse → normalize → persist → return.
//!
//! Everything up to the guard runs synchronously in the caller's first poll,
//! so two racing requests for the same key are decided before either awaits.
//! The rest runs on its own task: if the caller disconnects, the run still
//! finishes and persists. Nothing is written unless every stage succeeds.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, info_span, warn, Instrument, Level};
use uuid::Uuid;

use crate::analysis::composer::{compose, ProviderRequest, ValidatedInput};
use crate::analysis::gateway::ProviderGateway;
use crate::analysis::normalizer::{normalize, RunContext};
use crate::analysis::parser::parse;
use crate::analysis::single_flight::{FlightKey, FlightPermit, SingleFlight};
use crate::analysis::validation::{validate_job, validate_resume, JobInput};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisResult, AnalysisSummary};
use crate::store::{job_not_found, AnalysisStore, JobStore};

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Composing,
    CallingProvider,
    Parsing,
    Normalizing,
    Persisting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Composing => "composing",
            Stage::CallingProvider => "calling_provider",
            Stage::Parsing => "parsing",
            Stage::Normalizing => "normalizing",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    debug!(%stage, "analysis stage");
}

/// Caller mistakes are warned about here. Server-side failures are logged
/// with their detail when the response is built, so only the stage is noted.
fn failure_level(err: &AppError) -> Level {
    match err {
        AppError::Validation(_) | AppError::NotFound(_) | AppError::Conflict => Level::WARN,
        _ => Level::DEBUG,
    }
}

/// Logs the failed transition and hands the error back for `?`.
fn failed(stage: Stage, err: impl Into<AppError>) -> AppError {
    let err = err.into();
    if failure_level(&err) == Level::WARN {
        warn!(%stage, code = err.code(), "analysis failed: {err}");
    } else {
        debug!(%stage, code = err.code(), "analysis failed");
    }
    err
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of a job-compatibility request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAnalysis {
    Completed(AnalysisResult),
    /// The job description was too short to analyze. Nothing ran, nothing was stored.
    InsufficientContent,
}

#[derive(Clone)]
pub struct Pipeline {
    gateway: ProviderGateway,
    analyses: Arc<dyn AnalysisStore>,
    jobs: Arc<dyn JobStore>,
    in_flight: SingleFlight,
}

impl Pipeline {
    pub fn new(
        gateway: ProviderGateway,
        analyses: Arc<dyn AnalysisStore>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            gateway,
            analyses,
            jobs,
            in_flight: SingleFlight::new(),
        }
    }

    /// Scores a résumé on its own.
    pub async fn analyze_resume(
        &self,
        owner_id: Uuid,
        resume_text: &str,
    ) -> Result<AnalysisResult, AppError> {
        enter(Stage::Validating);
        let resume = validate_resume(resume_text).map_err(|e| failed(Stage::Validating, e))?;

        let permit = self
            .in_flight
            .try_acquire(FlightKey::resume(owner_id, resume.text()))
            .ok_or_else(|| failed(Stage::Validating, AppError::Conflict))?;

        enter(Stage::Composing);
        let request = compose(ValidatedInput::Resume(&resume));

        let ctx = RunContext {
            owner_id,
            job_id: None,
        };
        self.spawn_run(ctx, request, permit).await
    }

    /// Scores a résumé against a job description and merges the job fields
    /// into the owner's job record.
    pub async fn analyze_job(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        job_description: &str,
        resume_text: &str,
    ) -> Result<JobAnalysis, AppError> {
        enter(Stage::Validating);
        let (resume, job_description) = match validate_job(resume_text, job_description)
            .map_err(|e| failed(Stage::Validating, e))?
        {
            JobInput::Ready {
                resume,
                job_description,
            } => (resume, job_description),
            JobInput::InsufficientContent => {
                info!("Job description for job {job_id} too short, skipping analysis");
                return Ok(JobAnalysis::InsufficientContent);
            }
        };

        let permit = self
            .in_flight
            .try_acquire(FlightKey::job(owner_id, job_id))
            .ok_or_else(|| failed(Stage::Validating, AppError::Conflict))?;

        enter(Stage::Composing);
        let request = compose(ValidatedInput::Job {
            resume: &resume,
            job_description: &job_description,
        });

        let ctx = RunContext {
            owner_id,
            job_id: Some(job_id),
        };
        self.spawn_run(ctx, request, permit)
            .await
            .map(JobAnalysis::Completed)
    }

    /// Newest first.
    pub async fn history(&self, owner_id: Uuid) -> Result<Vec<AnalysisSummary>, AppError> {
        let analyses = self.analyses.list_by_owner(owner_id).await?;
        Ok(analyses.iter().map(AnalysisResult::summary).collect())
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<AnalysisResult, AppError> {
        self.analyses
            .get(owner_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))
    }

    /// No-op for unknown or foreign ids.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let deleted = self.analyses.delete_by_id(id, owner_id).await?;
        if deleted {
            info!("Deleted analysis {id} for owner {owner_id}");
        }
        Ok(deleted)
    }

    /// Runs the provider-facing stages on a detached task that owns `permit`.
    async fn spawn_run(
        &self,
        ctx: RunContext,
        request: ProviderRequest,
        permit: FlightPermit,
    ) -> Result<AnalysisResult, AppError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "analysis",
            %run_id,
            owner_id = %ctx.owner_id,
            mode = ?request.mode
        );

        let pipeline = self.clone();
        let handle = tokio::spawn(
            async move {
                let _permit = permit;
                pipeline.run(ctx, &request).await
            }
            .instrument(span),
        );

        handle
            .await
            .map_err(|e| AppError::Internal(anyhow!("analysis task {run_id} aborted: {e}")))?
    }

    async fn run(
        &self,
        ctx: RunContext,
        request: &ProviderRequest,
    ) -> Result<AnalysisResult, AppError> {
        if let Some(job_id) = ctx.job_id {
            self.jobs
                .get_job(ctx.owner_id, job_id)
                .await
                .map_err(|e| failed(Stage::Composing, e))?
                .ok_or_else(|| failed(Stage::Composing, job_not_found(job_id)))?;
        }

        enter(Stage::CallingProvider);
        let raw = self
            .gateway
            .invoke(request)
            .await
            .map_err(|e| failed(Stage::CallingProvider, e))?;

        enter(Stage::Parsing);
        let fields = parse(&raw).map_err(|e| failed(Stage::Parsing, e))?;

        enter(Stage::Normalizing);
        let result = normalize(fields, ctx);

        enter(Stage::Persisting);
        let saved = if result.job.is_some() {
            self.analyses.save_job_analysis(&result).await
        } else {
            self.analyses.save(&result).await
        };
        saved.map_err(|e| failed(Stage::Persisting, e))?;

        enter(Stage::Done);
        info!(
            "Analysis {} ({:?}) stored: score {}/100, ATS {}/100",
            result.id,
            result.mode(),
            result.score,
            result.ats_score
        );
        Ok(result)
    }
}
