//! Prompt Composer — turns validated input into a deterministic provider request.

use crate::analysis::prompts::{ANALYSIS_SYSTEM, JOB_PROMPT_TEMPLATE, RESUME_PROMPT_TEMPLATE};
use crate::analysis::validation::ValidatedResume;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, UNTRUSTED_INPUT_INSTRUCTION};
use crate::models::analysis::AnalysisMode;

/// What the gateway sends to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub mode: AnalysisMode,
    pub system: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy)]
pub enum ValidatedInput<'a> {
    Resume(&'a ValidatedResume),
    Job {
        resume: &'a ValidatedResume,
        job_description: &'a str,
    },
}

pub fn compose(input: ValidatedInput<'_>) -> ProviderRequest {
    let system = format!("{ANALYSIS_SYSTEM} {JSON_ONLY_SYSTEM}");

    match input {
        ValidatedInput::Resume(resume) => ProviderRequest {
            mode: AnalysisMode::Resume,
            system,
            prompt: fill(
                RESUME_PROMPT_TEMPLATE,
                &[
                    ("untrusted_input_instruction", UNTRUSTED_INPUT_INSTRUCTION),
                    ("resume_text", resume.text()),
                ],
            ),
        },
        ValidatedInput::Job {
            resume,
            job_description,
        } => ProviderRequest {
            mode: AnalysisMode::Job,
            system,
            prompt: fill(
                JOB_PROMPT_TEMPLATE,
                &[
                    ("untrusted_input_instruction", UNTRUSTED_INPUT_INSTRUCTION),
                    ("resume_text", resume.text()),
                    ("job_description", job_description),
                ],
            ),
        },
    }
}

/// Single-pass placeholder substitution. Text that is substituted in is never
/// scanned again, so user input containing `{job_description}` stays literal.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    'scan: while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        for (key, value) in vars {
            if after.starts_with(key) && after[key.len()..].starts_with('}') {
                out.push_str(&rest[..start]);
                out.push_str(value);
                rest = &after[key.len() + 1..];
                continue 'scan;
            }
        }
        out.push_str(&rest[..=start]);
        rest = after;
    }

    out.push_str(rest);
    out
}
