//! PostgreSQL backend. The schema is managed outside this service:
//!
//! - `analyses(id, owner_id, job_id, score, ats_score, suggestions jsonb,
//!   grammar_fixes, job_fit jsonb, created_at)`
//! - `jobs(id, owner_id, company, position, job_description, status, notes,
//!   applied_date, compatibility_score, matching_skills jsonb,
//!   missing_skills jsonb, recommendations jsonb, polished_resume,
//!   created_at, updated_at)`

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::{AnalysisResult, AnalysisRow, JobFitPatch};
use crate::models::job::{JobFields, JobRecord, JobRow};
use crate::store::{job_not_found, AnalysisStore, JobStore};

/// Single-statement partial update. `COALESCE` keeps every column whose
/// parameter is NULL, so concurrent merges never read-modify-write.
/// `polished_resume` is nullable, so `$8` says whether `$5` is written.
const MERGE_SQL: &str = r#"
    UPDATE jobs SET
        compatibility_score = COALESCE($1, compatibility_score),
        matching_skills     = COALESCE($2, matching_skills),
        missing_skills      = COALESCE($3, missing_skills),
        recommendations     = COALESCE($4, recommendations),
        polished_resume     = CASE WHEN $8 THEN $5 ELSE polished_resume END,
        updated_at          = NOW()
    WHERE id = $6 AND owner_id = $7
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_analysis(
        tx: &mut Transaction<'_, Postgres>,
        result: &AnalysisResult,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO analyses
                (id, owner_id, job_id, score, ats_score, suggestions, grammar_fixes, job_fit, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(result.id)
        .bind(result.owner_id)
        .bind(result.job.as_ref().map(|j| j.job_id))
        .bind(result.score as i16)
        .bind(result.ats_score as i16)
        .bind(Json(result.suggestions.clone()))
        .bind(result.grammar_fixes.as_deref())
        .bind(result.job.clone().map(Json))
        .bind(result.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn merge_in(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        job_id: Uuid,
        patch: &JobFitPatch,
    ) -> Result<(), AppError> {
        let updated = sqlx::query(MERGE_SQL)
            .bind(patch.compatibility_score.map(|s| s as i16))
            .bind(patch.matching_skills.clone().map(Json))
            .bind(patch.missing_skills.clone().map(Json))
            .bind(patch.recommendations.clone().map(Json))
            .bind(patch.polished_resume.clone().flatten())
            .bind(job_id)
            .bind(owner_id)
            .bind(patch.polished_resume.is_some())
            .execute(&mut **tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(job_not_found(job_id));
        }
        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for PgStore {
    async fn save(&self, result: &AnalysisResult) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;
        Self::insert_analysis(&mut tx, result).await?;
        tx.commit().await?;
        Ok(result.id)
    }

    async fn save_job_analysis(&self, result: &AnalysisResult) -> Result<Uuid, AppError> {
        let fit = result
            .job
            .as_ref()
            .ok_or_else(|| AppError::Internal(anyhow!("job analysis {} has no job fields", result.id)))?;

        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await?;
        Self::merge_in(&mut tx, result.owner_id, fit.job_id, &JobFitPatch::from(fit)).await?;
        Self::insert_analysis(&mut tx, result).await?;
        tx.commit().await?;

        info!("Stored analysis {} and merged into job {}", result.id, fit.job_id);
        Ok(result.id)
    }

    async fn merge(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        patch: &JobFitPatch,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        Self::merge_in(&mut tx, owner_id, job_id, patch).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<AnalysisResult>, AppError> {
        let rows = sqlx::query_as::<_, AnalysisRow>(
            "SELECT * FROM analyses WHERE owner_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AnalysisResult::from).collect())
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<AnalysisResult>, AppError> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            "SELECT * FROM analyses WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AnalysisResult::from))
    }

    async fn delete_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM analyses WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn list_jobs(&self, owner_id: Uuid) -> Result<Vec<JobRecord>, AppError> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE owner_id = $1 ORDER BY applied_date DESC NULLS LAST, created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(JobRecord::from).collect())
    }

    async fn get_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<Option<JobRecord>, AppError> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 AND owner_id = $2")
            .bind(job_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(JobRecord::from))
    }

    async fn create_job(&self, job: &JobRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO jobs
                (id, owner_id, company, position, job_description, status, notes,
                 applied_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(job.id)
        .bind(job.owner_id)
        .bind(&job.company)
        .bind(&job.position)
        .bind(&job.job_description)
        .bind(job.status.as_str())
        .bind(&job.notes)
        .bind(job.applied_date)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_job(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        fields: JobFields,
    ) -> Result<Option<JobRecord>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs SET
                company = $1, position = $2, job_description = $3,
                status = $4, notes = $5, applied_date = $6, updated_at = NOW()
            WHERE id = $7 AND owner_id = $8
            RETURNING *
            "#,
        )
        .bind(&fields.company)
        .bind(&fields.position)
        .bind(&fields.job_description)
        .bind(fields.status.as_str())
        .bind(&fields.notes)
        .bind(fields.applied_date)
        .bind(job_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(JobRecord::from))
    }

    async fn delete_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM jobs WHERE id = $1 AND owner_id = $2")
            .bind(job_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}
