use async_trait::async_trait;

use crate::{LlmClient, LlmError};

/// Closure-backed client used by the dry-run mode of the pipeline and by
/// tests across the workspace. The responder receives the system and user
/// prompts and decides the reply.
pub struct ScriptedClient<F> {
    model_id: String,
    responder: F,
}

impl<F> ScriptedClient<F>
where
    F: Fn(&str, &str) -> Result<String, LlmError> + Send + Sync,
{
    pub fn new(model_id: impl Into<String>, responder: F) -> Self {
        Self {
            model_id: model_id.into(),
            responder,
        }
    }
}

impl ScriptedClient<Box<dyn Fn(&str, &str) -> Result<String, LlmError> + Send + Sync>> {
    /// A client that always answers with the same text.
    pub fn canned(model_id: impl Into<String>, response: impl Into<String>) -> Self {
        let response = response.into();
        Self {
            model_id: model_id.into(),
            responder: Box::new(move |_sys, _user| Ok(response.clone())),
        }
    }
}

#[async_trait]
impl<F> LlmClient for ScriptedClient<F>
where
    F: Fn(&str, &str) -> Result<String, LlmError> + Send + Sync,
{
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        (self.responder)(system_prompt, user_prompt)
    }
}
