//! Test doubles shared by the analysis tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::analysis::composer::ProviderRequest;
use crate::analysis::gateway::{ProviderError, TextProvider};

/// Replays a fixed list of outcomes, one per call.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Answers the same output every time.
    pub fn always(output: &str) -> Self {
        Self::new(vec![Ok(output.to_string()); 16])
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    async fn complete(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let next = self.script.lock().unwrap().pop_front();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        next.unwrap_or_else(|| Err(ProviderError::Permanent("script exhausted".to_string())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A well-formed job-mode answer.
pub const JOB_OUTPUT: &str = r#"{
  "score": 74,
  "atsScore": 68,
  "suggestions": ["Lead with the payments migration", "Add a skills section"],
  "grammarFixes": "Jane Doe. Senior Backend Engineer.",
  "compatibilityScore": 81,
  "matchingSkills": ["Rust", "PostgreSQL", "rust"],
  "missingSkills": ["Kafka"],
  "recommendations": ["Mention event streaming work"],
  "polishedResume": "Jane Doe — Backend Engineer focused on Rust services."
}"#;

/// A well-formed résumé-mode answer.
pub const RESUME_OUTPUT: &str = r#"{
  "score": 72,
  "atsScore": 64,
  "suggestions": ["Quantify impact", "Shorten the summary"],
  "grammarFixes": "Jane Doe. Senior Backend Engineer."
}"#;

/// Plausible résumé text, comfortably over the minimum length.
pub const RESUME_TEXT: &str =
    "Jane Doe, Senior Backend Engineer. Eight years of Rust, Go and PostgreSQL at scale.";

pub const JOB_DESCRIPTION: &str =
    "Backend engineer for our payments platform. Rust, PostgreSQL and Kafka required.";
