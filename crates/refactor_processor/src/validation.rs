use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use compile_feedback::{Compiler, LogComparator};
use log::{info, warn};

/// Terminal state of one compile-repair loop.
#[derive(Debug)]
pub struct CompileLoopOutcome {
    pub success: bool,
    /// Repair attempts actually performed.
    pub attempts: usize,
    /// True when the loop stopped because a repair left the error
    /// signature unchanged.
    pub stalled: bool,
    pub last_logs: String,
}

/// Compilation-driven correction: compile, hand the extracted errors to a
/// repair callback, recompile, and keep going only while the failure
/// signature actually changes.
pub struct CompileLoop<C> {
    compiler: C,
    comparator: LogComparator,
    max_attempts: usize,
    compare_full_log: bool,
}

impl<C: Compiler> CompileLoop<C> {
    pub fn new(compiler: C, max_attempts: usize) -> Self {
        Self {
            compiler,
            comparator: LogComparator::new(),
            max_attempts,
            compare_full_log: false,
        }
    }

    /// Compare whole normalized logs instead of extracted error sets.
    pub fn compare_full_log(mut self, flag: bool) -> Self {
        self.compare_full_log = flag;
        self
    }

    /// Run the loop. `repair` receives the extracted error lines and is
    /// expected to rewrite the offending artifacts before the recompile.
    pub async fn run<F, Fut>(&self, project_dir: &Path, mut repair: F) -> Result<CompileLoopOutcome>
    where
        F: FnMut(Vec<String>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let outcome = self
            .compiler
            .compile(project_dir)
            .context("initial compilation failed to run")?;
        if outcome.success {
            info!("Project at {} compiles cleanly", project_dir.display());
            return Ok(CompileLoopOutcome {
                success: true,
                attempts: 0,
                stalled: false,
                last_logs: outcome.logs,
            });
        }

        let mut previous_logs = outcome.logs;
        for attempt in 1..=self.max_attempts {
            let errors = self.comparator.extract_errors(&previous_logs);
            info!(
                "Repair attempt {attempt}/{} with {} extracted error lines",
                self.max_attempts,
                errors.len()
            );
            repair(errors).await?;

            let outcome = self
                .compiler
                .compile(project_dir)
                .with_context(|| format!("recompilation failed to run on attempt {attempt}"))?;
            if outcome.success {
                info!("Compilation fixed after {attempt} repair attempts");
                return Ok(CompileLoopOutcome {
                    success: true,
                    attempts: attempt,
                    stalled: false,
                    last_logs: outcome.logs,
                });
            }
            if !self
                .comparator
                .has_error_changed(&previous_logs, &outcome.logs, self.compare_full_log)
            {
                warn!("Repair attempt {attempt} left the failure signature unchanged; giving up");
                return Ok(CompileLoopOutcome {
                    success: false,
                    attempts: attempt,
                    stalled: true,
                    last_logs: outcome.logs,
                });
            }
            info!(
                "Failure signature changed:\n{}",
                self.comparator.error_diff(&previous_logs, &outcome.logs)
            );
            previous_logs = outcome.logs;
        }

        warn!(
            "Compilation still failing after {} repair attempts",
            self.max_attempts
        );
        Ok(CompileLoopOutcome {
            success: false,
            attempts: self.max_attempts,
            stalled: false,
            last_logs: previous_logs,
        })
    }
}
