//! Content-addressed store for LLM exchanges.
//!
//! Every exchange is persisted as a markdown file with two literal section
//! markers, `# Prompt` and `# Response`, under a directory derived from the
//! prompt's semantic suffix (package path + prompt kind + class name) and
//! named after the sanitized model identifier. A present file is
//! authoritative: generation is skipped entirely and the parsed pair is
//! returned verbatim, so expensive LLM calls are never redone across runs.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

const PROMPT_MARKER: &str = "# Prompt";
const RESPONSE_MARKER: &str = "# Response";

#[derive(Debug, Error)]
pub enum CacheError {
    /// A cached exchange file missing either section marker. Never healed
    /// by regeneration: silently regenerating could produce inconsistent
    /// proto contracts across clients and server.
    #[error("cached exchange at {path} is corrupt: missing `{marker}` marker")]
    Corrupt { path: PathBuf, marker: &'static str },
    #[error("cache I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize structured result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A persisted prompt/response pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedExchange {
    pub prompt: String,
    pub response: String,
}

/// Output of a live generation handed to [`ResponseCache::get_or_generate`].
#[derive(Debug, Clone)]
pub struct GeneratedResponse {
    pub text: String,
    /// Structured result persisted as a sibling `.json` file when the
    /// artifact has a schema.
    pub structured: Option<serde_json::Value>,
}

impl GeneratedResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
        }
    }
}

pub struct ResponseCache {
    root: PathBuf,
}

impl ResponseCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location of an exchange: `<root>/<suffix>/<model>.md`.
    /// `model_id` must already be sanitized for file-system use.
    pub fn exchange_path(&self, suffix: &str, model_id: &str) -> PathBuf {
        self.root.join(suffix).join(format!("{model_id}.md"))
    }

    fn structured_path(&self, suffix: &str, model_id: &str) -> PathBuf {
        self.root.join(suffix).join(format!("{model_id}.json"))
    }

    /// Parse a cached exchange if one exists. A malformed file is a fatal
    /// [`CacheError::Corrupt`], not a miss.
    pub fn lookup(&self, suffix: &str, model_id: &str) -> Result<Option<CachedExchange>, CacheError> {
        let path = self.exchange_path(suffix, model_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let exchange = parse_exchange(&content, &path)?;
        debug!("Loaded cached exchange from {}", path.display());
        Ok(Some(exchange))
    }

    /// Persist an exchange (and optional structured sibling), creating
    /// directories as needed.
    pub fn store(
        &self,
        suffix: &str,
        model_id: &str,
        prompt: &str,
        response: &str,
        structured: Option<&serde_json::Value>,
    ) -> Result<(), CacheError> {
        let path = self.exchange_path(suffix, model_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, render_exchange(prompt, response))?;
        debug!("Saved exchange to {}", path.display());
        if let Some(value) = structured {
            let json_path = self.structured_path(suffix, model_id);
            fs::write(&json_path, serde_json::to_string_pretty(value)?)?;
            debug!("Saved structured result to {}", json_path.display());
        }
        Ok(())
    }

    /// Return the cached exchange for `(suffix, model_id)` if present,
    /// otherwise run `generator`, persist its output and return the live
    /// pair. The generator is expected to carry its own retry policy.
    pub async fn get_or_generate<F, Fut>(
        &self,
        model_id: &str,
        prompt: &str,
        suffix: &str,
        generator: F,
    ) -> anyhow::Result<CachedExchange>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = anyhow::Result<GeneratedResponse>>,
    {
        if let Some(exchange) = self.lookup(suffix, model_id)? {
            info!(
                "Cache hit for {}/{}; skipping generation",
                suffix, model_id
            );
            return Ok(exchange);
        }
        let generated = generator(prompt.to_string()).await?;
        self.store(
            suffix,
            model_id,
            prompt,
            &generated.text,
            generated.structured.as_ref(),
        )?;
        Ok(CachedExchange {
            prompt: prompt.to_string(),
            response: generated.text,
        })
    }
}

fn render_exchange(prompt: &str, response: &str) -> String {
    format!("\n{PROMPT_MARKER}\n{prompt}\n\n{RESPONSE_MARKER}\n{response}\n")
}

fn parse_exchange(content: &str, path: &Path) -> Result<CachedExchange, CacheError> {
    let prompt_idx = content.find(PROMPT_MARKER).ok_or(CacheError::Corrupt {
        path: path.to_path_buf(),
        marker: PROMPT_MARKER,
    })?;
    let response_idx = content.find(RESPONSE_MARKER).ok_or(CacheError::Corrupt {
        path: path.to_path_buf(),
        marker: RESPONSE_MARKER,
    })?;
    if response_idx < prompt_idx {
        warn!("Markers out of order in {}", path.display());
        return Err(CacheError::Corrupt {
            path: path.to_path_buf(),
            marker: RESPONSE_MARKER,
        });
    }
    let prompt = content[prompt_idx + PROMPT_MARKER.len()..response_idx].trim();
    let response = content[response_idx + RESPONSE_MARKER.len()..].trim();
    Ok(CachedExchange {
        prompt: prompt.to_string(),
        response: response.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn second_call_is_served_from_disk() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let exchange = cache
                .get_or_generate("model", "the prompt", "com/app/proto/Order", |_p| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(GeneratedResponse::text_only("the response"))
                })
                .await
                .unwrap();
            assert_eq!(exchange.prompt, "the prompt");
            assert_eq!(exchange.response, "the response");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn structured_results_get_a_json_sibling() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        cache
            .get_or_generate("model", "p", "suffix", |_p| async move {
                Ok(GeneratedResponse {
                    text: "{}".to_string(),
                    structured: Some(serde_json::json!({"service_name": "OrderService"})),
                })
            })
            .await
            .unwrap();
        let json_path = dir.path().join("suffix").join("model.json");
        let content = std::fs::read_to_string(json_path).unwrap();
        assert!(content.contains("OrderService"));
    }

    #[test]
    fn missing_marker_is_corruption_not_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        let path = cache.exchange_path("suffix", "model");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "# Prompt\nonly a prompt, truncated file").unwrap();

        let err = cache.lookup("suffix", "model").unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { marker, .. } if marker == "# Response"));
    }

    #[test]
    fn round_trip_preserves_both_sections() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        cache
            .store("a/b", "model", "multi\nline prompt", "resp", None)
            .unwrap();
        let exchange = cache.lookup("a/b", "model").unwrap().unwrap();
        assert_eq!(exchange.prompt, "multi\nline prompt");
        assert_eq!(exchange.response, "resp");
    }

    #[test]
    fn absent_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        assert!(cache.lookup("nope", "model").unwrap().is_none());
    }
}
