use log::{debug, info, warn};
use thiserror::Error;

use crate::cleanup::strip_code_fence;
use crate::invoker::{CachedInvoker, Exchange};

#[derive(Debug, Error)]
pub enum GenError {
    /// The verification predicate kept rejecting the artifact until the
    /// attempt budget ran out. No artifact is emitted; upstream treats
    /// this as a class-level failure.
    #[error("max correction attempts ({0}) reached without healthy code")]
    CorrectionExhausted(usize),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Prompts for one LLM call plus the cache suffix identifying it.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub system: String,
    pub user: String,
    pub suffix: String,
}

/// Outcome of the verification predicate.
#[derive(Debug, Clone)]
pub struct Verification {
    pub healthy: bool,
    pub feedback: String,
}

impl Verification {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            feedback: String::new(),
        }
    }

    pub fn unhealthy(feedback: impl Into<String>) -> Self {
        Self {
            healthy: false,
            feedback: feedback.into(),
        }
    }
}

/// Transient state of one artifact-generation run. Reset per artifact.
#[derive(Debug, Default)]
pub struct GenState {
    pub correction_attempts: usize,
    pub generated_code: Option<String>,
    pub corrected_code: Option<String>,
    pub final_response: Option<String>,
    pub code_healthy: bool,
    /// Verification feedback driving the current correction attempt.
    pub feedback: String,
    /// Every exchange of the run, oldest first.
    pub history: Vec<Exchange>,
}

impl GenState {
    /// The prompt/response pair of the initial generation call.
    pub fn generation_exchange(&self) -> Option<&Exchange> {
        self.history.first()
    }
}

/// Per-artifact-kind customization: prompt construction and verification.
/// The default verification accepts everything; compilation-driven
/// correction is wired by the orchestration layer, not baked in here.
pub trait GenHooks: Send + Sync {
    fn gen_prompts(&self) -> Prompts;

    fn correction_prompts(&self, state: &GenState) -> Prompts;

    fn verify(&self, _state: &GenState) -> Verification {
        Verification::healthy()
    }
}

/// Drives the generate -> verify -> correct -> postprocess loop.
pub struct GenEngine {
    gen_invoker: CachedInvoker,
    correction_invoker: CachedInvoker,
    max_correction_attempts: usize,
}

impl GenEngine {
    pub const DEFAULT_MAX_CORRECTION_ATTEMPTS: usize = 3;

    pub fn new(
        gen_invoker: CachedInvoker,
        correction_invoker: CachedInvoker,
        max_correction_attempts: usize,
    ) -> Self {
        Self {
            gen_invoker,
            correction_invoker,
            max_correction_attempts,
        }
    }

    /// Engine whose correction calls go through the same model as
    /// generation.
    pub fn single_model(invoker: CachedInvoker, max_correction_attempts: usize) -> Self {
        Self::new(invoker.clone(), invoker, max_correction_attempts)
    }

    pub async fn run(&self, hooks: &dyn GenHooks) -> Result<GenState, GenError> {
        let mut state = GenState::default();

        let prompts = hooks.gen_prompts();
        debug!("Generating artifact for suffix {}", prompts.suffix);
        let exchange = self
            .gen_invoker
            .call(&prompts.system, &prompts.user, &prompts.suffix)
            .await?;
        state.generated_code = Some(exchange.response.clone());
        state.history.push(exchange);

        loop {
            let verification = hooks.verify(&state);
            if verification.healthy {
                debug!("No issues found in the code. Continuing workflow.");
                return Ok(self.postprocess(state));
            }
            if state.correction_attempts >= self.max_correction_attempts {
                warn!(
                    "Max correction attempts ({}) reached. Exiting workflow.",
                    self.max_correction_attempts
                );
                return Err(GenError::CorrectionExhausted(self.max_correction_attempts));
            }
            if state.correction_attempts == 0 {
                debug!("Found issues in the generated code. Attempting to correct it.");
            } else {
                debug!(
                    "Found issues in the corrected code. Attempting to correct it again ({}/{}).",
                    state.correction_attempts + 1,
                    self.max_correction_attempts
                );
            }
            state.feedback = verification.feedback;
            state.correction_attempts += 1;

            let prompts = hooks.correction_prompts(&state);
            // Partition the cache namespace per attempt so a retry is
            // never satisfied by the previous attempt's cached answer.
            let suffix = format!("{}/attempt-{}", prompts.suffix, state.correction_attempts);
            let exchange = self
                .correction_invoker
                .call(&prompts.system, &prompts.user, &suffix)
                .await?;
            state.corrected_code = Some(exchange.response.clone());
            state.history.push(exchange);
        }
    }

    fn postprocess(&self, mut state: GenState) -> GenState {
        let raw = state
            .corrected_code
            .clone()
            .or_else(|| state.generated_code.clone())
            .unwrap_or_default();
        let cleaned = strip_code_fence(&raw);
        if cleaned.is_empty() {
            warn!("Postprocessing produced an empty artifact");
        } else {
            info!("Artifact finalized ({} chars)", cleaned.len());
        }
        state.final_response = Some(cleaned);
        state.code_healthy = true;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_requester::{LlmError, RetryPolicy, ScriptedClient};
    use response_cache::ResponseCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct StaticHooks {
        verify_healthy: bool,
    }

    impl GenHooks for StaticHooks {
        fn gen_prompts(&self) -> Prompts {
            Prompts {
                system: "You generate code.".into(),
                user: "Generate the artifact.".into(),
                suffix: "com/app/test/Thing".into(),
            }
        }

        fn correction_prompts(&self, state: &GenState) -> Prompts {
            Prompts {
                system: "You correct code.".into(),
                user: format!("Fix it. Feedback: {}", state.feedback),
                suffix: "com/app/test/Thing/correction".into(),
            }
        }

        fn verify(&self, _state: &GenState) -> Verification {
            if self.verify_healthy {
                Verification::healthy()
            } else {
                Verification::unhealthy("still broken")
            }
        }
    }

    fn engine_with(
        dir: &TempDir,
        responder: impl Fn(&str, &str) -> Result<String, LlmError> + Send + Sync + 'static,
        max_attempts: usize,
    ) -> GenEngine {
        let cache = Arc::new(ResponseCache::new(dir.path()));
        let client = Arc::new(ScriptedClient::new("test/gen", responder));
        let policy = RetryPolicy {
            base_delay_secs: 0,
            ..RetryPolicy::default()
        };
        GenEngine::single_model(CachedInvoker::new(cache, client, policy), max_attempts)
    }

    #[tokio::test]
    async fn healthy_code_goes_straight_to_postprocess() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with(&dir, |_s, _u| Ok("```java\nclass A {}\n```".into()), 3);
        let state = engine
            .run(&StaticHooks {
                verify_healthy: true,
            })
            .await
            .unwrap();
        assert_eq!(state.final_response.as_deref(), Some("class A {}"));
        assert_eq!(state.correction_attempts, 0);
        assert!(state.code_healthy);
    }

    #[tokio::test]
    async fn always_unhealthy_terminates_after_exactly_max_attempts() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let engine = engine_with(
            &dir,
            move |_s, _u| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("bad code".into())
            },
            3,
        );
        let err = engine
            .run(&StaticHooks {
                verify_healthy: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::CorrectionExhausted(3)));
        // One generation call plus exactly three correction calls.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_model_answer_is_emitted_as_empty_string() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with(&dir, |_s, _u| Ok("   ".into()), 3);
        let state = engine
            .run(&StaticHooks {
                verify_healthy: true,
            })
            .await
            .unwrap();
        assert_eq!(state.final_response.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn correction_feedback_reaches_the_correction_prompt() {
        let dir = TempDir::new().unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        let sink = seen.clone();
        let engine = engine_with(
            &dir,
            move |_s, user| {
                sink.lock().unwrap().push(user.to_string());
                Ok("code".into())
            },
            1,
        );
        let _ = engine
            .run(&StaticHooks {
                verify_healthy: false,
            })
            .await;
        let prompts = seen.lock().unwrap();
        assert!(prompts.iter().any(|p| p.contains("still broken")));
    }
}
