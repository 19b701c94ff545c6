// All LLM prompt constants for the analysis pipeline.
// The key names below are the contract the response parser reads back.

/// System prompt for résumé analysis — enforces JSON-only output.
pub const ANALYSIS_SYSTEM: &str = "You are an expert resume reviewer, career coach and \
    Applicant Tracking System (ATS) specialist. You score resumes honestly and give \
    concrete, actionable feedback.";

/// Résumé-only prompt template.
/// Replace: {untrusted_input_instruction}, {resume_text}
pub const RESUME_PROMPT_TEMPLATE: &str = r#"{untrusted_input_instruction}

Analyze the resume below and return a JSON object with this EXACT schema (no extra fields):
{
  "score": 78,
  "atsScore": 71,
  "suggestions": [
    "Quantify the impact of the payment service migration (latency, cost, users)"
  ],
  "grammarFixes": "The complete resume text with grammar, spelling and punctuation corrected"
}

RULES:
1. "score" is the overall resume quality as an integer from 0 to 100
2. "atsScore" estimates how well an Applicant Tracking System can parse the resume, integer 0 to 100
3. "suggestions" holds at most 10 short, specific improvements, most important first
4. "grammarFixes" is the FULL corrected resume text, keeping the original structure and facts
5. Never invent experience, employers, dates or metrics

RESUME:
<<<
{resume_text}
>>>"#;

/// Résumé + job description prompt template.
/// Replace: {untrusted_input_instruction}, {resume_text}, {job_description}
pub const JOB_PROMPT_TEMPLATE: &str = r#"{untrusted_input_instruction}

Compare the resume with the job description below and return a JSON object with this EXACT schema (no extra fields):
{
  "score": 78,
  "atsScore": 71,
  "suggestions": [
    "Move the Kubernetes experience into the summary"
  ],
  "grammarFixes": "The complete resume text with grammar, spelling and punctuation corrected",
  "compatibilityScore": 64,
  "matchingSkills": ["Rust", "PostgreSQL"],
  "missingSkills": ["Kafka"],
  "recommendations": [
    "Mention the event streaming work from the logistics project if it used Kafka"
  ],
  "polishedResume": "The complete resume rewritten and tailored to this job"
}

RULES:
1. All scores are integers from 0 to 100
2. "compatibilityScore" measures how well the resume fits THIS job
3. "matchingSkills" are skills required by the job that the resume demonstrates
4. "missingSkills" are skills required by the job that the resume does not demonstrate
5. "suggestions" and "recommendations" hold at most 10 items each, most important first
6. "grammarFixes" and "polishedResume" are FULL resume texts, not excerpts
7. "polishedResume" may reorder and rephrase, but must never invent experience, employers, dates or metrics

RESUME:
<<<
{resume_text}
>>>

JOB DESCRIPTION:
<<<
{job_description}
>>>"#;
