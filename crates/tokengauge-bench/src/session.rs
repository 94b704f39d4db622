//! Sequences prompt jobs through the engine, strictly one at a time, and
//! aggregates the session report.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tokengauge_core::{
    BenchError, PromptSet, Result, ServiceDescriptor, SessionReport, SessionSummary,
};

use crate::engine::BenchmarkEngine;
use crate::view::LiveView;

/// Which prompts to run. `All` means every entry in definition order.
#[derive(Debug, Clone)]
pub enum Selection {
    All,
    Named(Vec<String>),
}

/// Politeness delay between queued prompts.
const INTER_PROMPT_PAUSE: Duration = Duration::from_secs(2);

pub struct SessionRunner {
    engine: BenchmarkEngine,
    prompts: PromptSet,
    results_dir: PathBuf,
    pause: Duration,
    silent: bool,
}

impl SessionRunner {
    pub fn new(service: ServiceDescriptor, prompts: PromptSet) -> Result<Self> {
        Ok(Self {
            engine: BenchmarkEngine::new(service)?,
            prompts,
            results_dir: PathBuf::from("results"),
            pause: INTER_PROMPT_PAUSE,
            silent: false,
        })
    }

    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Disables terminal repaints for scripted runs and tests.
    pub fn silenced(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Runs the selected prompts sequentially. Per-job failures are
    /// logged and skipped; cancellation closes the log with whatever
    /// partial data exists and returns the partial report.
    pub async fn run(
        &self,
        selection: &Selection,
        cancel: &CancellationToken,
    ) -> Result<SessionReport> {
        let names = match selection {
            Selection::All => self.prompts.names(),
            Selection::Named(names) => names.clone(),
        };

        let mut view = LiveView::start_session(self.engine.service(), &self.results_dir);
        if self.silent {
            view = view.silenced();
        }
        if let Some(path) = view.log_path() {
            info!("Session log: {}", path.display());
        }

        let mut completed = Vec::new();
        let mut cancelled = false;

        for (i, name) in names.iter().enumerate() {
            let Some(job) = self.prompts.get(name) else {
                warn!("No prompt named '{}', skipping", name);
                continue;
            };

            match self.engine.run_prompt(job, &mut view, cancel).await {
                Ok(metrics) => {
                    info!(
                        "'{}' complete: {} tokens, {:.2} t/s",
                        name, metrics.total_tokens, metrics.tokens_per_second
                    );
                    completed.push(metrics);
                }
                Err(BenchError::Cancelled) => {
                    warn!("Session cancelled during '{}'", name);
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!("Benchmark failed for '{}': {}", name, e);
                }
            }

            // politeness pause, skipped after the last prompt
            if i + 1 < names.len() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.pause) => {}
                }
            }
        }

        let log_path = view.log_path().map(PathBuf::from);
        view.end_session();

        Ok(SessionReport {
            attempted: names.len(),
            summary: SessionSummary::from_metrics(&completed),
            completed,
            log_path,
            cancelled,
        })
    }
}
