//! Schema Validator — checks raw text before any provider spend.

use thiserror::Error;

/// Minimum trimmed length of a résumé submitted for analysis.
pub const MIN_RESUME_CHARS: usize = 50;
/// Job descriptions shorter than this are not worth an AI call.
pub const MIN_JOB_DESCRIPTION_CHARS: usize = 20;
/// Upper bound on any single text input, to cap provider payloads.
pub const MAX_INPUT_CHARS: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your resume text")]
    EmptyResume,

    #[error("Resume text must be at least {MIN_RESUME_CHARS} characters")]
    ResumeTooShort { chars: usize },

    #[error("{field} must be at most {MAX_INPUT_CHARS} characters")]
    TooLong { field: &'static str, chars: usize },
}

/// A résumé that passed validation. Holds the trimmed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResume {
    text: String,
}

impl ValidatedResume {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Outcome of validating a job-compatibility request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    Ready {
        resume: ValidatedResume,
        job_description: String,
    },
    /// The description is too thin to analyze; the provider is skipped.
    InsufficientContent,
}

pub fn validate_resume(raw: &str) -> Result<ValidatedResume, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyResume);
    }

    let chars = text.chars().count();
    if chars < MIN_RESUME_CHARS {
        return Err(ValidationError::ResumeTooShort { chars });
    }
    if chars > MAX_INPUT_CHARS {
        return Err(ValidationError::TooLong {
            field: "Resume text",
            chars,
        });
    }

    Ok(ValidatedResume {
        text: text.to_string(),
    })
}

/// Validates the résumé first: a bad résumé is an error even when the
/// description would have been skipped.
pub fn validate_job(resume: &str, job_description: &str) -> Result<JobInput, ValidationError> {
    let resume = validate_resume(resume)?;

    let description = job_description.trim();
    let chars = description.chars().count();
    if chars < MIN_JOB_DESCRIPTION_CHARS {
        return Ok(JobInput::InsufficientContent);
    }
    if chars > MAX_INPUT_CHARS {
        return Err(ValidationError::TooLong {
            field: "Job description",
            chars,
        });
    }

    Ok(JobInput::Ready {
        resume,
        job_description: description.to_string(),
    })
}
