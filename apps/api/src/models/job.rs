use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::analysis::{clamp_stored, JobFitPatch};

/// Application pipeline stage of a tracked job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Applied,
    Interviewing,
    Rejected,
    Offered,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Rejected => "Rejected",
            JobStatus::Offered => "Offered",
        }
    }

    /// Unknown stored values fall back to `Applied`.
    pub fn parse(value: &str) -> Self {
        match value {
            "Interviewing" => JobStatus::Interviewing,
            "Rejected" => JobStatus::Rejected,
            "Offered" => JobStatus::Offered,
            _ => JobStatus::Applied,
        }
    }
}

/// A tracked job application. Core fields are user-owned; the analysis
/// fields are only ever written by a job analysis merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub company: String,
    pub position: String,
    pub job_description: String,
    pub status: JobStatus,
    pub notes: String,
    pub applied_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polished_resume: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(owner_id: Uuid, fields: JobFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            company: fields.company,
            position: fields.position,
            job_description: fields.job_description,
            status: fields.status,
            notes: fields.notes,
            applied_date: fields.applied_date,
            compatibility_score: None,
            matching_skills: None,
            missing_skills: None,
            recommendations: None,
            polished_resume: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the core fields. Analysis fields are left alone.
    pub fn apply_fields(&mut self, fields: JobFields) {
        self.company = fields.company;
        self.position = fields.position;
        self.job_description = fields.job_description;
        self.status = fields.status;
        self.notes = fields.notes;
        self.applied_date = fields.applied_date;
        self.updated_at = Utc::now();
    }

    /// Writes the fields present in `patch`. Core fields are left alone.
    pub fn apply_patch(&mut self, patch: &JobFitPatch) {
        if let Some(score) = patch.compatibility_score {
            self.compatibility_score = Some(score);
        }
        if let Some(skills) = &patch.matching_skills {
            self.matching_skills = Some(skills.clone());
        }
        if let Some(skills) = &patch.missing_skills {
            self.missing_skills = Some(skills.clone());
        }
        if let Some(recommendations) = &patch.recommendations {
            self.recommendations = Some(recommendations.clone());
        }
        if let Some(polished) = &patch.polished_resume {
            self.polished_resume = polished.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// User-editable core fields of a job record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFields {
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub applied_date: Option<NaiveDate>,
}

impl JobFields {
    /// Trims text fields and rejects blank company/position.
    pub fn normalized(self) -> Result<Self, String> {
        let company = self.company.trim().to_string();
        let position = self.position.trim().to_string();
        if company.is_empty() {
            return Err("company cannot be empty".to_string());
        }
        if position.is_empty() {
            return Err("position cannot be empty".to_string());
        }
        Ok(Self {
            company,
            position,
            job_description: self.job_description.trim().to_string(),
            notes: self.notes.trim().to_string(),
            ..self
        })
    }
}

/// Row shape of the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub company: String,
    pub position: String,
    pub job_description: String,
    pub status: String,
    pub notes: String,
    pub applied_date: Option<NaiveDate>,
    pub compatibility_score: Option<i16>,
    pub matching_skills: Option<Json<Vec<String>>>,
    pub missing_skills: Option<Json<Vec<String>>>,
    pub recommendations: Option<Json<Vec<String>>>,
    pub polished_resume: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            company: row.company,
            position: row.position,
            job_description: row.job_description,
            status: JobStatus::parse(&row.status),
            notes: row.notes,
            applied_date: row.applied_date,
            compatibility_score: row.compatibility_score.map(clamp_stored),
            matching_skills: row.matching_skills.map(|j| j.0),
            missing_skills: row.missing_skills.map(|j| j.0),
            recommendations: row.recommendations.map(|j| j.0),
            polished_resume: row.polished_resume,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
