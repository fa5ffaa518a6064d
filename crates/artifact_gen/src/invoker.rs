use std::sync::Arc;

use anyhow::{Context, Result};
use llm_requester::{
    invoke_structured, invoke_with_retry, sanitize_model_id, LlmClient, RetryPolicy,
};
use log::debug;
use response_cache::{GeneratedResponse, ResponseCache};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One prompt/response pair as it went over the wire (or came from disk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub prompt: String,
    pub response: String,
}

/// An LLM client bound to the response cache: every call is looked up on
/// disk first and persisted after a live generation, making the pipeline
/// idempotent across runs.
#[derive(Clone)]
pub struct CachedInvoker {
    cache: Arc<ResponseCache>,
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl CachedInvoker {
    pub fn new(cache: Arc<ResponseCache>, client: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self {
            cache,
            client,
            policy,
        }
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    fn render_prompt(system_prompt: &str, user_prompt: &str) -> String {
        format!("system: {system_prompt}\n\nuser: {user_prompt}")
    }

    /// Cache-backed free-text call. The retry policy applies only to the
    /// live path; a cache hit never touches the network.
    pub async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        suffix: &str,
    ) -> Result<Exchange> {
        let rendered = Self::render_prompt(system_prompt, user_prompt);
        let client = self.client.clone();
        let policy = self.policy;
        let system_prompt = system_prompt.to_string();
        let user_prompt = user_prompt.to_string();
        let cached = self
            .cache
            .get_or_generate(
                &sanitize_model_id(client.model_id()),
                &rendered,
                suffix,
                move |_prompt| async move {
                    let text =
                        invoke_with_retry(client.as_ref(), &system_prompt, &user_prompt, &policy)
                            .await?;
                    Ok(GeneratedResponse::text_only(text))
                },
            )
            .await
            .with_context(|| format!("generation failed for suffix {suffix}"))?;
        Ok(Exchange {
            prompt: cached.prompt,
            response: cached.response,
        })
    }

    /// Structured call through the parsing model. The parsed record is
    /// written through to the cache (markdown plus a `.json` sibling) for
    /// replay and inspection.
    pub async fn parse<T>(&self, system_prompt: &str, user_prompt: &str, suffix: &str) -> Result<T>
    where
        T: DeserializeOwned + Serialize,
    {
        debug!(
            "Parsing response into structured form with model {}",
            self.client.model_id()
        );
        let parsed: T =
            invoke_structured(self.client.as_ref(), system_prompt, user_prompt, &self.policy)
                .await
                .with_context(|| format!("structured parsing failed for suffix {suffix}"))?;
        let value = serde_json::to_value(&parsed)?;
        let rendered = Self::render_prompt(system_prompt, user_prompt);
        self.cache.store(
            suffix,
            &sanitize_model_id(self.client.model_id()),
            &rendered,
            &serde_json::to_string_pretty(&value)?,
            Some(&value),
        )?;
        Ok(parsed)
    }
}
