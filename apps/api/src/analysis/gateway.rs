//! Provider Gateway — timeout and retry policy around a text-generation provider.
//!
//! The provider sits behind `TextProvider` so the pipeline never depends on a
//! concrete API. Transient failures are retried with exponential backoff up to
//! the attempt cap; permanent failures return immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::composer::ProviderRequest;
use crate::config::ProviderPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Timeout, rate limit, overload, 5xx. Worth retrying.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// Invalid request or content rejected. Retrying will not help.
    #[error("permanent provider failure: {0}")]
    Permanent(String),
}

/// A text-generation capability. One call is one attempt.
#[async_trait]
pub trait TextProvider: Send + Sync {
    async fn complete(&self, request: &ProviderRequest) -> Result<String, ProviderError>;

    /// Identifier for logs.
    fn name(&self) -> &str;
}

#[derive(Clone)]
pub struct ProviderGateway {
    provider: Arc<dyn TextProvider>,
    policy: ProviderPolicy,
}

impl ProviderGateway {
    pub fn new(provider: Arc<dyn TextProvider>, policy: ProviderPolicy) -> Self {
        Self { provider, policy }
    }

    /// Sends `request`, returning the provider's raw text output.
    pub async fn invoke(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                warn!(
                    "Provider attempt {}/{} failed ({}), retrying after {}ms...",
                    attempt,
                    max_attempts,
                    last_error,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let outcome =
                tokio::time::timeout(self.policy.timeout, self.provider.complete(request)).await;

            match outcome {
                Ok(Ok(raw)) => {
                    debug!(
                        "Provider {} answered on attempt {} ({} chars)",
                        self.provider.name(),
                        attempt + 1,
                        raw.len()
                    );
                    return Ok(raw);
                }
                Ok(Err(ProviderError::Permanent(message))) => {
                    warn!("Provider {} refused request: {message}", self.provider.name());
                    return Err(ProviderError::Permanent(message));
                }
                Ok(Err(ProviderError::Transient(message))) => last_error = message,
                Err(_) => {
                    last_error = format!("timed out after {}s", self.policy.timeout.as_secs_f32())
                }
            }
        }

        Err(ProviderError::Transient(format!(
            "gave up after {max_attempts} attempts: {last_error}"
        )))
    }

    /// Exponential backoff: base, 2×base, 4×base, …
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.policy.base_backoff.saturating_mul(1 << exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::ScriptedProvider;
    use crate::models::analysis::AnalysisMode;

    fn request() -> ProviderRequest {
        ProviderRequest {
            mode: AnalysisMode::Resume,
            system: "system".to_string(),
            prompt: "prompt".to_string(),
        }
    }

    fn policy() -> ProviderPolicy {
        ProviderPolicy {
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("{\"score\": 1}".to_string())]));
        let gateway = ProviderGateway::new(provider.clone(), policy());
        assert_eq!(gateway.invoke(&request()).await.unwrap(), "{\"score\": 1}");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Transient("429".to_string())),
            Err(ProviderError::Transient("503".to_string())),
            Ok("ok".to_string()),
        ]));
        let gateway = ProviderGateway::new(provider.clone(), policy());
        assert_eq!(gateway.invoke(&request()).await.unwrap(), "ok");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Transient("529".to_string())),
            Err(ProviderError::Transient("529".to_string())),
            Err(ProviderError::Transient("529".to_string())),
            Ok("never reached".to_string()),
        ]));
        let gateway = ProviderGateway::new(provider.clone(), policy());
        let err = gateway.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transient(ref m) if m.contains("3 attempts")));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Permanent("400 invalid_request_error".to_string())),
            Ok("never reached".to_string()),
        ]));
        let gateway = ProviderGateway::new(provider.clone(), policy());
        let err = gateway.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Permanent(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transient() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![Ok("late".to_string()), Ok("late".to_string())])
                .with_delay(Duration::from_secs(30)),
        );
        let gateway = ProviderGateway::new(
            provider.clone(),
            ProviderPolicy {
                max_attempts: 2,
                ..policy()
            },
        );
        let err = gateway.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transient(ref m) if m.contains("timed out")));
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_backoff_doubles() {
        let gateway = ProviderGateway::new(Arc::new(ScriptedProvider::new(vec![])), policy());
        assert_eq!(gateway.backoff(1), Duration::from_millis(100));
        assert_eq!(gateway.backoff(2), Duration::from_millis(200));
        assert_eq!(gateway.backoff(3), Duration::from_millis(400));
    }
}
