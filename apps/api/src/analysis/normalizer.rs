//! Scoring Normalizer — turns parsed fields into a storable `AnalysisResult`.
//!
//! Guarantees on the output:
//! - every score is an integer in [0, 100]
//! - list fields hold at most `MAX_LIST_ITEMS` non-empty entries
//! - skill sets are deduplicated case-insensitively, first spelling wins
//! - rewritten texts are trimmed, capped at `MAX_REWRITE_CHARS`, and absent when empty
//! - résumé-only runs carry no job fields at all

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::analysis::parser::ParsedFields;
use crate::models::analysis::{AnalysisResult, JobFit};

pub const MAX_LIST_ITEMS: usize = 10;
pub const MAX_REWRITE_CHARS: usize = 20_000;

/// Identity of the run being normalized. `job_id` is set for job analyses.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub owner_id: Uuid,
    pub job_id: Option<Uuid>,
}

/// Callers must only pass fields for which `has_score()` holds; the parser
/// guarantees that. Missing scores are derived from the mean of those present.
pub fn normalize(fields: ParsedFields, ctx: RunContext) -> AnalysisResult {
    let fallback = mean_score(&fields);
    let score = clamp_score(fields.score.unwrap_or(fallback));
    let ats_score = clamp_score(fields.ats_score.unwrap_or(fallback));

    let job = ctx.job_id.map(|job_id| JobFit {
        job_id,
        compatibility_score: clamp_score(fields.compatibility_score.unwrap_or(fallback)),
        matching_skills: dedup_skills(fields.matching_skills),
        missing_skills: dedup_skills(fields.missing_skills),
        recommendations: cap_list(fields.recommendations),
        polished_resume: cap_text(fields.polished_resume),
    });

    AnalysisResult {
        id: Uuid::new_v4(),
        owner_id: ctx.owner_id,
        created_at: Utc::now(),
        score,
        ats_score,
        suggestions: cap_list(fields.suggestions),
        grammar_fixes: cap_text(fields.grammar_fixes),
        job,
    }
}

/// Clamps into [0, 100] and rounds to the nearest integer.
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn mean_score(fields: &ParsedFields) -> f64 {
    let present: Vec<f64> = [fields.score, fields.ats_score, fields.compatibility_score]
        .into_iter()
        .flatten()
        .map(|s| s.clamp(0.0, 100.0))
        .collect();
    if present.is_empty() {
        return 0.0;
    }
    present.iter().sum::<f64>() / present.len() as f64
}

fn cap_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(MAX_LIST_ITEMS)
        .collect()
}

fn dedup_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = skills
        .into_iter()
        .map(|skill| skill.trim().to_string())
        .filter(|skill| !skill.is_empty())
        .filter(|skill| seen.insert(skill.to_lowercase()))
        .collect();
    cap_list(unique)
}

fn cap_text(text: Option<String>) -> Option<String> {
    let text = text?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(match trimmed.char_indices().nth(MAX_REWRITE_CHARS) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resume_ctx() -> RunContext {
        RunContext {
            owner_id: Uuid::new_v4(),
            job_id: None,
        }
    }

    fn job_ctx() -> RunContext {
        RunContext {
            owner_id: Uuid::new_v4(),
            job_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_clamps_out_of_range_scores() {
        assert_eq!(clamp_score(145.0), 100);
        assert_eq!(clamp_score(-5.0), 0);
        assert_eq!(clamp_score(72.4), 72);
        assert_eq!(clamp_score(72.5), 73);
        assert_eq!(clamp_score(f64::NAN), 0);
    }

    #[test]
    fn test_normalize_clamps_every_score() {
        let fields = ParsedFields {
            score: Some(145.0),
            ats_score: Some(-5.0),
            compatibility_score: Some(300.0),
            ..Default::default()
        };
        let result = normalize(fields, job_ctx());
        assert_eq!(result.score, 100);
        assert_eq!(result.ats_score, 0);
        assert_eq!(result.job.unwrap().compatibility_score, 100);
    }

    #[test]
    fn test_missing_scores_are_derived_from_present_ones() {
        let fields = ParsedFields {
            score: Some(80.0),
            ..Default::default()
        };
        let result = normalize(fields, resume_ctx());
        assert_eq!(result.score, 80);
        assert_eq!(result.ats_score, 80);
    }

    #[test]
    fn test_job_compatibility_derived_when_missing() {
        let fields = ParsedFields {
            score: Some(60.0),
            ats_score: Some(80.0),
            ..Default::default()
        };
        let result = normalize(fields, job_ctx());
        assert_eq!(result.job.unwrap().compatibility_score, 70);
    }

    #[test]
    fn test_resume_mode_drops_job_fields() {
        let fields = ParsedFields {
            score: Some(50.0),
            compatibility_score: Some(90.0),
            matching_skills: vec!["Rust".to_string()],
            polished_resume: Some("tailored".to_string()),
            ..Default::default()
        };
        let result = normalize(fields, resume_ctx());
        assert!(result.job.is_none());
    }

    #[test]
    fn test_skills_dedup_case_insensitive_first_spelling_wins() {
        let fields = ParsedFields {
            score: Some(50.0),
            matching_skills: vec![
                "Rust".to_string(),
                "rust".to_string(),
                " PostgreSQL ".to_string(),
                "RUST".to_string(),
                "postgresql".to_string(),
                "".to_string(),
            ],
            ..Default::default()
        };
        let job = normalize(fields, job_ctx()).job.unwrap();
        assert_eq!(job.matching_skills, vec!["Rust", "PostgreSQL"]);
    }

    #[test]
    fn test_lists_truncated_to_max() {
        let many: Vec<String> = (0..25).map(|i| format!("Suggestion {i}")).collect();
        let fields = ParsedFields {
            score: Some(50.0),
            suggestions: many.clone(),
            recommendations: many,
            ..Default::default()
        };
        let result = normalize(fields, job_ctx());
        assert_eq!(result.suggestions.len(), MAX_LIST_ITEMS);
        assert_eq!(result.suggestions[0], "Suggestion 0");
        assert_eq!(result.job.unwrap().recommendations.len(), MAX_LIST_ITEMS);
    }

    #[test]
    fn test_missing_lists_stay_empty() {
        let result = normalize(
            ParsedFields {
                ats_score: Some(40.0),
                ..Default::default()
            },
            job_ctx(),
        );
        assert!(result.suggestions.is_empty());
        let job = result.job.unwrap();
        assert!(job.matching_skills.is_empty());
        assert!(job.missing_skills.is_empty());
        assert!(job.recommendations.is_empty());
        assert!(job.polished_resume.is_none());
    }

    #[test]
    fn test_rewrites_are_trimmed_and_capped() {
        let long = "x".repeat(MAX_REWRITE_CHARS + 500);
        let fields = ParsedFields {
            score: Some(50.0),
            grammar_fixes: Some(format!("  {long}  ")),
            polished_resume: Some("   ".to_string()),
            ..Default::default()
        };
        let result = normalize(fields, job_ctx());
        assert_eq!(
            result.grammar_fixes.unwrap().chars().count(),
            MAX_REWRITE_CHARS
        );
        assert!(result.job.unwrap().polished_resume.is_none());
    }

    #[test]
    fn test_cap_text_respects_char_boundaries() {
        let text = "é".repeat(MAX_REWRITE_CHARS + 1);
        let capped = cap_text(Some(text)).unwrap();
        assert_eq!(capped.chars().count(), MAX_REWRITE_CHARS);
    }

    #[test]
    fn test_each_result_gets_a_fresh_id() {
        let fields = ParsedFields {
            score: Some(50.0),
            ..Default::default()
        };
        let ctx = resume_ctx();
        let a = normalize(fields.clone(), ctx);
        let b = normalize(fields, ctx);
        assert_ne!(a.id, b.id);
        assert_eq!(a.owner_id, ctx.owner_id);
    }
}
