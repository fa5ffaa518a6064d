use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use checkpoint_store::CheckpointStore;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};
use tokio::sync::{Mutex, Semaphore};

use crate::class_refactor::{ClassRefactor, RefactorOutput, RefactorRequest};

/// Receives each class's artifacts as soon as they are complete, before
/// the class is checkpointed. Typically writes them to disk.
pub type ArtifactSink = dyn Fn(&RefactorOutput) -> Result<()> + Send + Sync;

fn progress_style_spinner() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

fn progress_style_bar() -> ProgressStyle {
    ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}").unwrap()
}

/// Outcome of one batch run over a class set.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<String>,
    /// Classes skipped because the loaded checkpoint already records them.
    pub skipped: Vec<String>,
    pub failed: BTreeMap<String, String>,
}

impl BatchReport {
    /// Collapse the report into a result for callers that treat any class
    /// failure as a run failure.
    pub fn into_result(self) -> Result<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(anyhow!("{} classes failed", self.failed.len()))
        }
    }
}

/// Batch driver over many classes with checkpointed progress. One class
/// failing never stops the batch; its error lands in the report.
pub struct BatchDriver {
    refactor: Arc<ClassRefactor>,
    checkpoints: Arc<CheckpointStore>,
    concurrent_limit: usize,
    sink: Option<Arc<ArtifactSink>>,
}

impl BatchDriver {
    pub fn new(
        refactor: Arc<ClassRefactor>,
        checkpoints: Arc<CheckpointStore>,
        concurrent_limit: usize,
    ) -> Self {
        Self {
            refactor,
            checkpoints,
            concurrent_limit: concurrent_limit.max(1),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub async fn run(&self, run_id: &str, requests: Vec<RefactorRequest>) -> Result<BatchReport> {
        info!("Starting batch run {run_id} over {} classes", requests.len());
        let checkpoint = self.checkpoints.load_or_new(run_id);

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(requests.len() as u64));
        overall.set_style(progress_style_bar());
        overall.set_message("overall progress");

        let mut report = BatchReport::default();
        let checkpoint = Arc::new(Mutex::new(checkpoint));
        let pool = Arc::new(Semaphore::new(self.concurrent_limit));
        let mut handles = Vec::new();

        for request in requests {
            if checkpoint.lock().await.is_complete(&request.class_name) {
                info!(
                    "Skipping {}: already complete in checkpoint for run {run_id}",
                    request.class_name
                );
                report.skipped.push(request.class_name.clone());
                overall.inc(1);
                continue;
            }

            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(progress_style_spinner());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar.set_message(format!("queued: {}", request.class_name));

            let pool = pool.clone();
            let refactor = self.refactor.clone();
            let checkpoint = checkpoint.clone();
            let store = self.checkpoints.clone();
            let overall = overall.clone();
            let sink = self.sink.clone();
            let class_key = request.class_name.clone();
            let class_name = request.class_name.clone();

            let handle = tokio::spawn(async move {
                let _permit = pool
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow!("worker pool closed: {e}"))?;
                bar.set_message(format!("refactoring: {class_name}"));
                match refactor.refactor_class(&request).await {
                    Ok(output) => {
                        if let Some(sink) = &sink {
                            if let Err(e) = sink(&output) {
                                bar.abandon_with_message(format!("failed: {class_name}"));
                                overall.inc(1);
                                return Err(e.context("writing artifacts failed"));
                            }
                        }
                        let mut checkpoint = checkpoint.lock().await;
                        checkpoint.mark_complete(&class_name, Some(output.summary()));
                        if let Err(e) = store.save(&checkpoint) {
                            warn!("Could not save checkpoint after {class_name}: {e}");
                        }
                        bar.finish_with_message(format!("done: {class_name}"));
                        overall.inc(1);
                        Ok(())
                    }
                    Err(e) => {
                        bar.abandon_with_message(format!("failed: {class_name}"));
                        overall.inc(1);
                        Err(e)
                    }
                }
            });
            handles.push((class_key, handle));
        }

        for (class_name, handle) in handles {
            match handle.await {
                Ok(Ok(())) => report.completed.push(class_name),
                Ok(Err(e)) => {
                    report.failed.insert(class_name, format!("{e:#}"));
                }
                Err(e) => {
                    report.failed.insert(class_name, e.to_string());
                }
            }
        }
        overall.finish_with_message("batch complete");

        if report.failed.is_empty() {
            info!(
                "Batch run {run_id} finished: {} completed, {} skipped",
                report.completed.len(),
                report.skipped.len()
            );
        } else {
            warn!(
                "Batch run {run_id} finished with {} failures ({} completed, {} skipped)",
                report.failed.len(),
                report.completed.len(),
                report.skipped.len()
            );
        }
        Ok(report)
    }
}
