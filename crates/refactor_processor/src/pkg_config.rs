use config::{Config, File};
use serde::Deserialize;

/// Generation and batch settings, loaded from `config/config.toml`.
#[derive(Deserialize, Clone)]
pub struct GenerationSettings {
    /// Correction budget of the per-artifact state machine.
    pub max_correction_attempts: usize,
    /// Classes refactored concurrently by the batch driver.
    pub concurrent_limit: usize,
    /// Compare whole normalized compilation logs instead of extracted
    /// error sets.
    pub compare_full_log: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_correction_attempts: 3,
            concurrent_limit: 2,
            compare_full_log: false,
        }
    }
}

pub fn get_config() -> Result<GenerationSettings, config::ConfigError> {
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
    let settings: GenerationSettings = config.get("generation")?;
    Ok(settings)
}

/// Settings with a fallback to defaults when no config file is present.
pub fn get_config_or_default() -> GenerationSettings {
    match get_config() {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Could not load generation config ({}), using defaults", e);
            GenerationSettings::default()
        }
    }
}
