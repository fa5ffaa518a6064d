use config::{Config, File};
use serde::Deserialize;

use crate::RetryPolicy;

/// Model selection and retry settings, loaded from `config/config.toml`.
#[derive(Deserialize, Clone)]
pub struct LlmSettings {
    /// Generation model (free-text code generation).
    pub gen_model: String,
    /// Parsing model (free text -> structured object).
    pub parsing_model: String,
    /// Correction model; usually the generation model.
    pub correction_model: String,
    pub timeout_secs: u64,
    pub transient_retries: usize,
    pub validation_retries: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            gen_model: "openai/gpt-4o".to_string(),
            parsing_model: "mistralai/ministral-3b".to_string(),
            correction_model: "openai/gpt-4o".to_string(),
            timeout_secs: 120,
            transient_retries: 3,
            validation_retries: 2,
        }
    }
}

impl LlmSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            transient_attempts: self.transient_retries,
            validation_attempts: self.validation_retries,
            base_delay_secs: 2,
        }
    }
}

pub fn get_config() -> Result<LlmSettings, config::ConfigError> {
    // Try multiple possible paths for the config file
    let possible_paths = [
        "config/config.toml",       // From project root
        "../config/config.toml",    // From crates subdirectory
        "../../config/config.toml", // From deeper nested directories
    ];

    let mut config_builder = Config::builder();
    let mut found_config = false;

    for path in &possible_paths {
        if std::path::Path::new(path).exists() {
            config_builder = config_builder.add_source(File::with_name(path));
            found_config = true;
            break;
        }
    }

    if !found_config {
        return Err(config::ConfigError::NotFound(
            "config.toml not found in any expected location".to_string(),
        ));
    }

    let config = config_builder.build()?;
    let settings: LlmSettings = config.get("llm")?;
    Ok(settings)
}

/// Settings with a fallback to defaults when no config file is present.
pub fn get_config_or_default() -> LlmSettings {
    match get_config() {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Could not load LLM config ({}), using defaults", e);
            LlmSettings::default()
        }
    }
}
