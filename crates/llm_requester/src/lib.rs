//! LLM request layer for the refactoring pipeline.
//!
//! The transport itself is a black box behind [`LlmClient`]; this crate
//! owns the error taxonomy (transient vs validation vs fatal), the bounded
//! retry driver and the structured-output schemas produced by the parsing
//! model.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::time::sleep;

pub mod output;
pub mod pkg_config;
pub mod scripted;

pub use output::{GrpcSolution, ProtoSolution};
pub use scripted::ScriptedClient;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request timed out: {0}")]
    Timeout(String),
    #[error("LLM connection failure: {0}")]
    Connection(String),
    #[error("LLM response failed validation: {0}")]
    Validation(String),
    #[error("LLM request failed: {0}")]
    Fatal(String),
}

impl LlmError {
    /// Timeout/connection-class errors are retried with backoff; the rest
    /// are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Timeout(_) | LlmError::Connection(_))
    }
}

/// Black-box LLM capability: given a system and user prompt, return text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Identifier of the underlying model, e.g. `openai/gpt-4o`.
    fn model_id(&self) -> &str;

    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Retry budgets for one logical call. Transient errors get the larger
/// budget with exponential backoff; validation errors get the smaller one
/// with no backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub transient_attempts: usize,
    pub validation_attempts: usize,
    pub base_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            transient_attempts: 3,
            validation_attempts: 2,
            base_delay_secs: 2,
        }
    }
}

/// Model identifiers contain `/`; flatten them for use as file names.
pub fn sanitize_model_id(model_id: &str) -> String {
    model_id.replace('/', "--")
}

/// Invoke the client, retrying timeout/connection-class failures up to the
/// policy's transient budget with exponential backoff. Validation and fatal
/// errors surface immediately.
pub async fn invoke_with_retry(
    client: &dyn LlmClient,
    system_prompt: &str,
    user_prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, LlmError> {
    let max_attempts = policy.transient_attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=max_attempts {
        debug!(
            "LLM request attempt {} of {} with model {}",
            attempt,
            max_attempts,
            client.model_id()
        );
        match client.invoke(system_prompt, user_prompt).await {
            Ok(response) => {
                info!(
                    "LLM request completed on attempt {}, response length: {} chars",
                    attempt,
                    response.len()
                );
                return Ok(response);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.base_delay_secs * 2u64.pow((attempt - 1) as u32);
                warn!(
                    "Transient LLM failure on attempt {} ({}), retrying in {}s",
                    attempt, e, delay
                );
                last_error = Some(e);
                sleep(Duration::from_secs(delay)).await;
            }
            Err(e) => {
                error!("LLM request failed on attempt {}: {}", attempt, e);
                return Err(e);
            }
        }
    }
    // Only reachable when the transient budget is exhausted.
    let final_error = last_error
        .unwrap_or_else(|| LlmError::Fatal("retry loop exited without an error".to_string()));
    error!(
        "All {} attempts failed with model {}: {}",
        max_attempts,
        client.model_id(),
        final_error
    );
    Err(final_error)
}

/// Invoke the client and parse the response into `T`. A response that does
/// not parse counts against the (smaller) validation budget and is retried
/// without backoff; transient failures within each attempt follow the
/// transient budget.
pub async fn invoke_structured<T>(
    client: &dyn LlmClient,
    system_prompt: &str,
    user_prompt: &str,
    policy: &RetryPolicy,
) -> Result<T, LlmError>
where
    T: serde::de::DeserializeOwned,
{
    let max_attempts = policy.validation_attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=max_attempts {
        let text = invoke_with_retry(client, system_prompt, user_prompt, policy).await?;
        let candidate = strip_json_fence(&text);
        match serde_json::from_str::<T>(candidate) {
            Ok(parsed) => {
                debug!("Structured response parsed on attempt {}", attempt);
                return Ok(parsed);
            }
            Err(e) => {
                warn!(
                    "Structured response failed validation on attempt {} of {}: {}",
                    attempt, max_attempts, e
                );
                last_error = Some(LlmError::Validation(e.to_string()));
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| LlmError::Validation("no parse attempt was made".to_string())))
}

/// Models often wrap JSON answers in a ```json fence; accept both shapes.
pub fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = match inner.find('\n') {
        Some(idx) => &inner[idx + 1..],
        None => inner,
    };
    inner.trim_end().trim_end_matches('`').trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyClient {
        calls: Arc<AtomicUsize>,
        fail_first: usize,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        fn model_id(&self) -> &str {
            "test/flaky"
        }

        async fn invoke(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(LlmError::Timeout("simulated".into()))
            } else {
                Ok("ok".to_string())
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            transient_attempts: 3,
            validation_attempts: 2,
            base_delay_secs: 0,
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = FlakyClient {
            calls: calls.clone(),
            fail_first: 2,
        };
        let out = invoke_with_retry(&client, "sys", "user", &fast_policy())
            .await
            .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_budget_exhaustion_surfaces_the_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = FlakyClient {
            calls: calls.clone(),
            fail_first: 10,
        };
        let err = invoke_with_retry(&client, "sys", "user", &fast_policy())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn validation_failures_use_the_smaller_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let client = ScriptedClient::new("test/parse", move |_sys, _user| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("not json".to_string())
        });
        let err = invoke_structured::<serde_json::Value>(&client, "s", "u", &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn structured_parse_accepts_fenced_json() {
        let client = ScriptedClient::canned("test/parse", "```json\n{\"a\": 1}\n```");
        let value = invoke_structured::<serde_json::Value>(&client, "s", "u", &fast_policy())
            .await
            .unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn model_ids_are_sanitized_for_paths() {
        assert_eq!(sanitize_model_id("openai/gpt-4o"), "openai--gpt-4o");
    }
}
