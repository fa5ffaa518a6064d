//! Durable record of refactoring progress, keyed by run identifier.
//!
//! Loading and saving are independent toggles so a run can regenerate
//! everything while still recording progress, or replay without writing.
//! Replaying a checkpointed run must never re-invoke the LLM for classes
//! already marked complete; the batch driver enforces that by consulting
//! [`Checkpoint::is_complete`] before scheduling a class.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Progress of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: String,
    pub completed_class_keys: BTreeSet<String>,
    pub partial_results: BTreeMap<String, serde_json::Value>,
}

impl Checkpoint {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    pub fn is_complete(&self, class_key: &str) -> bool {
        self.completed_class_keys.contains(class_key)
    }

    pub fn mark_complete(&mut self, class_key: impl Into<String>, partial: Option<serde_json::Value>) {
        let key = class_key.into();
        if let Some(value) = partial {
            self.partial_results.insert(key.clone(), value);
        }
        self.completed_class_keys.insert(key);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointConfig {
    pub should_load: bool,
    pub should_save: bool,
}

pub struct CheckpointStore {
    root: PathBuf,
    config: CheckpointConfig,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>, config: CheckpointConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn config(&self) -> CheckpointConfig {
        self.config
    }

    fn checkpoint_path(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id).join("checkpoint.json")
    }

    /// Load the checkpoint for `run_id`, or `None` when loading is
    /// disabled or no checkpoint exists yet.
    pub fn load(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        if !self.config.should_load {
            debug!("Checkpoint loading disabled for run {}", run_id);
            return Ok(None);
        }
        let path = self.checkpoint_path(run_id);
        if !path.exists() {
            info!("No checkpoint found for run {}", run_id);
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&content)?;
        info!(
            "Loaded checkpoint for run {} with {} completed classes",
            run_id,
            checkpoint.completed_class_keys.len()
        );
        Ok(Some(checkpoint))
    }

    /// Persist the checkpoint; a no-op when saving is disabled.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        if !self.config.should_save {
            debug!("Checkpoint saving disabled for run {}", checkpoint.run_id);
            return Ok(());
        }
        let path = self.checkpoint_path(&checkpoint.run_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(checkpoint)?)?;
        debug!("Saved checkpoint to {}", path.display());
        Ok(())
    }

    /// Load the run's checkpoint or start a fresh one.
    pub fn load_or_new(&self, run_id: &str) -> Checkpoint {
        match self.load(run_id) {
            Ok(Some(checkpoint)) => checkpoint,
            Ok(None) => Checkpoint::new(run_id),
            Err(e) => {
                warn!("Could not load checkpoint for run {}: {}", run_id, e);
                Checkpoint::new(run_id)
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, should_load: bool, should_save: bool) -> CheckpointStore {
        CheckpointStore::new(
            dir.path(),
            CheckpointConfig {
                should_load,
                should_save,
            },
        )
    }

    #[test]
    fn checkpoint_round_trips_losslessly() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, true, true);
        let mut checkpoint = Checkpoint::new("run-1");
        checkpoint.mark_complete("com.app.Order", Some(serde_json::json!({"clients": 2})));
        checkpoint.mark_complete("com.app.User", None);
        store.save(&checkpoint).unwrap();

        let loaded = store.load("run-1").unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
        assert!(loaded.is_complete("com.app.Order"));
        assert!(!loaded.is_complete("com.app.Item"));
    }

    #[test]
    fn load_toggle_off_ignores_existing_checkpoints() {
        let dir = TempDir::new().unwrap();
        let writer = store(&dir, false, true);
        writer.save(&Checkpoint::new("run-1")).unwrap();

        let reader = store(&dir, false, true);
        assert!(reader.load("run-1").unwrap().is_none());
    }

    #[test]
    fn save_toggle_off_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, true, false);
        store.save(&Checkpoint::new("run-1")).unwrap();
        assert!(store.load("run-1").unwrap().is_none());
    }

    #[test]
    fn load_or_new_falls_back_to_a_fresh_checkpoint() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, true, true);
        let checkpoint = store.load_or_new("run-9");
        assert_eq!(checkpoint.run_id, "run-9");
        assert!(checkpoint.completed_class_keys.is_empty());
    }
}
