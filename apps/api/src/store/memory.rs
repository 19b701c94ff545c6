//! In-process backend used when no `DATABASE_URL` is configured, and by tests.
//! Everything is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::{AnalysisResult, JobFitPatch};
use crate::models::job::{JobFields, JobRecord};
use crate::store::{job_not_found, AnalysisStore, JobStore};

#[derive(Default)]
struct Inner {
    /// Insertion order.
    analyses: Vec<AnalysisResult>,
    jobs: HashMap<Uuid, JobRecord>,
}

impl Inner {
    fn owned_job_mut(&mut self, owner_id: Uuid, job_id: Uuid) -> Option<&mut JobRecord> {
        self.jobs
            .get_mut(&job_id)
            .filter(|job| job.owner_id == owner_id)
    }
}

/// One lock over both collections, so a save+merge is a single critical section.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn save(&self, result: &AnalysisResult) -> Result<Uuid, AppError> {
        self.inner.lock().await.analyses.push(result.clone());
        Ok(result.id)
    }

    async fn save_job_analysis(&self, result: &AnalysisResult) -> Result<Uuid, AppError> {
        let fit = result.job.as_ref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "job analysis {} has no job fields",
                result.id
            ))
        })?;

        let mut inner = self.inner.lock().await;
        let job = inner
            .owned_job_mut(result.owner_id, fit.job_id)
            .ok_or_else(|| job_not_found(fit.job_id))?;
        job.apply_patch(&JobFitPatch::from(fit));
        inner.analyses.push(result.clone());
        Ok(result.id)
    }

    async fn merge(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        patch: &JobFitPatch,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        let job = inner
            .owned_job_mut(owner_id, job_id)
            .ok_or_else(|| job_not_found(job_id))?;
        job.apply_patch(patch);
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<AnalysisResult>, AppError> {
        let inner = self.inner.lock().await;
        // Reverse first so equal timestamps still come out newest first after the stable sort.
        let mut owned: Vec<AnalysisResult> = inner
            .analyses
            .iter()
            .rev()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<AnalysisResult>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .analyses
            .iter()
            .find(|a| a.id == id && a.owner_id == owner_id)
            .cloned())
    }

    async fn delete_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        let before = inner.analyses.len();
        inner
            .analyses
            .retain(|a| !(a.id == id && a.owner_id == owner_id));
        Ok(inner.analyses.len() < before)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn list_jobs(&self, owner_id: Uuid) -> Result<Vec<JobRecord>, AppError> {
        let inner = self.inner.lock().await;
        let mut jobs: Vec<JobRecord> = inner
            .jobs
            .values()
            .filter(|job| job.owner_id == owner_id)
            .cloned()
            .collect();
        // `None` sorts below `Some`, so reversing puts undated jobs last.
        jobs.sort_by(|a, b| {
            b.applied_date
                .cmp(&a.applied_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(jobs)
    }

    async fn get_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<Option<JobRecord>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .get(&job_id)
            .filter(|job| job.owner_id == owner_id)
            .cloned())
    }

    async fn create_job(&self, job: &JobRecord) -> Result<(), AppError> {
        self.inner.lock().await.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_job(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        fields: JobFields,
    ) -> Result<Option<JobRecord>, AppError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.owned_job_mut(owner_id, job_id).map(|job| {
            job.apply_fields(fields);
            job.clone()
        }))
    }

    async fn delete_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.owned_job_mut(owner_id, job_id).is_none() {
            return Ok(false);
        }
        Ok(inner.jobs.remove(&job_id).is_some())
    }
}
