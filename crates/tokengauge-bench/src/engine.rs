//! Streaming benchmark engine: one prompt job from request to finalized
//! metrics.
//!
//! The engine owns the job's `LiveMetrics` exclusively and pushes
//! immutable snapshots into the view from the same loop that consumes the
//! stream. When streaming fails it falls back once to a non-streaming
//! request with a fresh clock; cancellation never falls back.

use std::time::Duration;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tokengauge_core::{
    BenchError, BenchmarkMetrics, LiveMetrics, MetricsSnapshot, PromptJob, Result,
    ServiceDescriptor, ServiceKind,
};

use crate::parser::{decode_completion, decode_line, StreamEvent};
use crate::view::LiveView;

/// Generation is slow; give a single request plenty of room.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
/// Cap on generated length, fixed per run.
const MAX_GENERATION_TOKENS: u64 = 500;
/// Minimum interval between live repaints driven by content.
const REPAINT_INTERVAL: Duration = Duration::from_millis(500);
/// Repaint anyway when no line has arrived for this long, so the live
/// timer keeps moving.
const IDLE_TICK: Duration = Duration::from_secs(1);

pub struct BenchmarkEngine {
    service: ServiceDescriptor,
    client: reqwest::Client,
}

impl BenchmarkEngine {
    pub fn new(service: ServiceDescriptor) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BenchError::Transport(e.to_string()))?;
        Ok(Self { service, client })
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    /// Runs one prompt job to completion: streams, falls back once on
    /// stream failure, and writes the final metrics through the view.
    pub async fn run_prompt(
        &self,
        job: &PromptJob,
        view: &mut LiveView,
        cancel: &CancellationToken,
    ) -> Result<BenchmarkMetrics> {
        view.start_prompt(&job.name, &job.text);

        // Unsupported services fail before any request is sent.
        let endpoint = self.endpoint()?;

        let snapshot = match self.stream_prompt(&endpoint, job, view, cancel).await {
            Ok(snapshot) => snapshot,
            Err(BenchError::Cancelled) => return Err(BenchError::Cancelled),
            Err(e) => {
                warn!("Streaming failed for '{}', falling back: {}", job.name, e);
                self.fallback_prompt(&endpoint, job, view, cancel).await?
            }
        };

        let metrics =
            BenchmarkMetrics::from_snapshot(&snapshot, &job.name, self.service.display_name());
        view.complete_prompt(&snapshot);
        Ok(metrics)
    }

    fn endpoint(&self) -> Result<String> {
        let suffix = match self.service.kind {
            ServiceKind::Ollama => "/api/generate",
            ServiceKind::Vllm => "/v1/completions",
            ServiceKind::LlamaCpp => "/completion",
            ServiceKind::Unknown => {
                return Err(BenchError::UnsupportedService(
                    self.service.display_name().to_string(),
                ))
            }
        };
        Ok(format!("{}{}", self.service.base_url, suffix))
    }

    fn payload(&self, prompt: &str, stream: bool) -> Value {
        match self.service.kind {
            ServiceKind::Ollama => json!({
                "model": self.service.model,
                "prompt": prompt,
                "stream": stream,
            }),
            ServiceKind::Vllm => json!({
                "model": self.service.model,
                "prompt": prompt,
                "max_tokens": MAX_GENERATION_TOKENS,
                "stream": stream,
            }),
            ServiceKind::LlamaCpp => json!({
                "prompt": prompt,
                "n_predict": MAX_GENERATION_TOKENS,
                "stream": stream,
            }),
            // endpoint() rejected Unknown already
            ServiceKind::Unknown => Value::Null,
        }
    }

    async fn send(&self, endpoint: &str, body: &Value) -> Result<reqwest::Response> {
        let mut request = self.client.post(endpoint).json(body);
        for (name, value) in &self.service.auth_headers {
            request = request.header(name, value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BenchError::Transport(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| BenchError::Transport(e.to_string()))
    }

    async fn stream_prompt(
        &self,
        endpoint: &str,
        job: &PromptJob,
        view: &mut LiveView,
        cancel: &CancellationToken,
    ) -> Result<MetricsSnapshot> {
        let body = self.payload(&job.text, true);
        let mut live = LiveMetrics::start();
        view.update(&live.snapshot());

        let response = self.send(endpoint, &body).await?;
        let mut stream = response.bytes_stream();

        // Cross-chunk line reassembly. Buffered as raw bytes so a
        // multibyte character split across chunks survives; only
        // complete lines are decoded to text.
        let mut pending: Vec<u8> = Vec::new();
        let mut last_repaint = std::time::Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BenchError::Cancelled),
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        pending.extend_from_slice(&bytes);
                        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                            let raw: Vec<u8> = pending.drain(..=pos).collect();
                            let line = String::from_utf8_lossy(&raw);
                            match self.apply_line(&mut live, line.trim_end()) {
                                LineOutcome::Content => {
                                    if last_repaint.elapsed() >= REPAINT_INTERVAL {
                                        view.update(&live.snapshot());
                                        last_repaint = std::time::Instant::now();
                                    }
                                }
                                LineOutcome::Finished => {
                                    view.update(&live.snapshot());
                                    return Ok(live.snapshot());
                                }
                                LineOutcome::Skipped => {}
                            }
                        }
                    }
                    Some(Err(e)) => return Err(BenchError::Transport(e.to_string())),
                    None => {
                        // Connection closed without an explicit Final
                        // marker: whatever accumulated is the result.
                        let trailing = std::mem::take(&mut pending);
                        let trailing = String::from_utf8_lossy(&trailing);
                        if matches!(
                            self.apply_line(&mut live, trailing.trim_end()),
                            LineOutcome::Finished
                        ) {
                            view.update(&live.snapshot());
                            return Ok(live.snapshot());
                        }
                        debug!("Stream for '{}' ended without a final marker", job.name);
                        live.finalize(None, None);
                        view.update(&live.snapshot());
                        return Ok(live.snapshot());
                    }
                },
                _ = tokio::time::sleep(IDLE_TICK) => {
                    live.touch();
                    view.update(&live.snapshot());
                    last_repaint = std::time::Instant::now();
                }
            }
        }
    }

    fn apply_line(&self, live: &mut LiveMetrics, line: &str) -> LineOutcome {
        match decode_line(self.service.kind, line) {
            StreamEvent::Delta(text) => {
                live.mark_first_token();
                live.append_delta(&text);
                LineOutcome::Content
            }
            StreamEvent::Final { text, tokens } => {
                if let Some(text) = text {
                    live.mark_first_token();
                    live.append_delta(&text);
                }
                live.finalize(None, tokens);
                LineOutcome::Finished
            }
            StreamEvent::Skip => LineOutcome::Skipped,
        }
    }

    /// Single non-streaming retry. The measurement restarts from a fresh
    /// clock; first-token time is response arrival, since no incremental
    /// signal exists on this path.
    async fn fallback_prompt(
        &self,
        endpoint: &str,
        job: &PromptJob,
        view: &mut LiveView,
        cancel: &CancellationToken,
    ) -> Result<MetricsSnapshot> {
        let body = self.payload(&job.text, false);
        let mut live = LiveMetrics::start();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(BenchError::Cancelled),
            r = self.send(endpoint, &body) => r?,
        };
        live.mark_first_token();

        let body_text = tokio::select! {
            _ = cancel.cancelled() => return Err(BenchError::Cancelled),
            r = response.text() => r.map_err(|e| BenchError::Transport(e.to_string()))?,
        };

        let (text, tokens) = decode_completion(self.service.kind, &body_text)?;
        live.finalize(Some(text), tokens);
        view.update(&live.snapshot());
        Ok(live.snapshot())
    }
}

enum LineOutcome {
    Content,
    Finished,
    Skipped,
}
