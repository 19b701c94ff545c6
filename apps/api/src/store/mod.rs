//! Analysis Store — persistence seams for analyses and the job records they merge into.
//!
//! `AppState` holds both as `Arc<dyn …>`. `PgStore` is the production
//! backend; `MemoryStore` backs local development without a database and
//! the test suite.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::{AnalysisResult, JobFitPatch};
use crate::models::job::{JobFields, JobRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Inserts a résumé-only result.
    async fn save(&self, result: &AnalysisResult) -> Result<Uuid, AppError>;

    /// Inserts a job result and merges its job fields into the job record,
    /// as one unit. `NotFound` (and nothing written) when the job is missing
    /// or owned by someone else.
    async fn save_job_analysis(&self, result: &AnalysisResult) -> Result<Uuid, AppError>;

    /// Writes only the fields present in `patch`. Core job fields are never touched.
    async fn merge(&self, owner_id: Uuid, job_id: Uuid, patch: &JobFitPatch)
        -> Result<(), AppError>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<AnalysisResult>, AppError>;

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<AnalysisResult>, AppError>;

    /// Returns whether a row was removed. Unknown or foreign ids are a no-op.
    async fn delete_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Most recently applied first; undated jobs last.
    async fn list_jobs(&self, owner_id: Uuid) -> Result<Vec<JobRecord>, AppError>;

    async fn get_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<Option<JobRecord>, AppError>;

    async fn create_job(&self, job: &JobRecord) -> Result<(), AppError>;

    /// Replaces the core fields. `None` when the job is missing or foreign.
    async fn update_job(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        fields: JobFields,
    ) -> Result<Option<JobRecord>, AppError>;

    async fn delete_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<bool, AppError>;
}

pub(crate) fn job_not_found(job_id: Uuid) -> AppError {
    AppError::NotFound(format!("Job {job_id} not found"))
}
