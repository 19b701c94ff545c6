use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Which composition mode a pipeline run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Résumé quality only.
    Resume,
    /// Résumé measured against a job description.
    Job,
}

/// Job-targeted part of an analysis. Absent entirely for résumé-only runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFit {
    pub job_id: Uuid,
    pub compatibility_score: u8,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polished_resume: Option<String>,
}

/// One completed analysis. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub score: u8,
    pub ats_score: u8,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_fixes: Option<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobFit>,
}

impl AnalysisResult {
    pub fn mode(&self) -> AnalysisMode {
        if self.job.is_some() {
            AnalysisMode::Job
        } else {
            AnalysisMode::Resume
        }
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            id: self.id,
            score: self.score,
            ats_score: self.ats_score,
            created_at: self.created_at,
            job_id: self.job.as_ref().map(|j| j.job_id),
        }
    }
}

/// History list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub score: u8,
    pub ats_score: u8,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

/// Partial update merged into a job record. `None` fields are left untouched.
/// `polished_resume: Some(None)` clears the stored text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFitPatch {
    pub compatibility_score: Option<u8>,
    pub matching_skills: Option<Vec<String>>,
    pub missing_skills: Option<Vec<String>>,
    pub recommendations: Option<Vec<String>>,
    pub polished_resume: Option<Option<String>>,
}

impl From<&JobFit> for JobFitPatch {
    fn from(fit: &JobFit) -> Self {
        Self {
            compatibility_score: Some(fit.compatibility_score),
            matching_skills: Some(fit.matching_skills.clone()),
            missing_skills: Some(fit.missing_skills.clone()),
            recommendations: Some(fit.recommendations.clone()),
            polished_resume: Some(fit.polished_resume.clone()),
        }
    }
}

/// Row shape of the `analyses` table.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub score: i16,
    pub ats_score: i16,
    pub suggestions: Json<Vec<String>>,
    pub grammar_fixes: Option<String>,
    pub job_fit: Option<Json<JobFit>>,
    pub created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for AnalysisResult {
    fn from(row: AnalysisRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            created_at: row.created_at,
            score: clamp_stored(row.score),
            ats_score: clamp_stored(row.ats_score),
            suggestions: row.suggestions.0,
            grammar_fixes: row.grammar_fixes,
            job: row.job_fit.map(|j| j.0),
        }
    }
}

/// Stored scores were clamped on the way in; clamp again on the way out so a
/// hand-edited row cannot break the [0,100] invariant.
pub(crate) fn clamp_stored(value: i16) -> u8 {
    value.clamp(0, 100) as u8
}
