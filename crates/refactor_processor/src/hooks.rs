use artifact_gen::{GenHooks, GenState, Prompts};
use prompt_builder::{correction_prompt, BuiltPrompt};

/// Generation hooks backed by a prebuilt prompt. The correction prompt is
/// derived from the run's own initial exchange plus the verification
/// feedback, so every artifact kind shares this one implementation.
pub struct PromptHooks {
    gen: BuiltPrompt,
}

impl PromptHooks {
    pub fn new(gen: BuiltPrompt) -> Self {
        Self { gen }
    }
}

impl GenHooks for PromptHooks {
    fn gen_prompts(&self) -> Prompts {
        Prompts {
            system: self.gen.system.clone(),
            user: self.gen.user.clone(),
            suffix: self.gen.suffix.clone(),
        }
    }

    fn correction_prompts(&self, state: &GenState) -> Prompts {
        let (original_prompt, original_response) = match state.generation_exchange() {
            Some(exchange) => (exchange.prompt.as_str(), exchange.response.as_str()),
            // Correction is only reachable after a generation exchange;
            // fall back to the built prompt if history is empty.
            None => (self.gen.user.as_str(), ""),
        };
        let built = correction_prompt(
            original_prompt,
            original_response,
            &state.feedback,
            &self.gen.suffix,
        );
        Prompts {
            system: built.system,
            user: built.user,
            suffix: built.suffix,
        }
    }
}
