use std::path::PathBuf;
use std::time::Instant;

/// Rough token estimate when the service does not report a count.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.split_whitespace().count() as f64 * 1.3).round() as u64
}

/// Mutable timing state of one in-flight prompt job.
///
/// Exclusively owned by the engine for the duration of the job. Estimated
/// and authoritative token counts are tracked separately; the authoritative
/// count wins whenever the service has supplied one. After `finalize` every
/// mutator is a no-op.
#[derive(Debug)]
pub struct LiveMetrics {
    started_at: Instant,
    first_token_at: Option<Instant>,
    updated_at: Instant,
    response: String,
    estimated_tokens: u64,
    token_count: Option<u64>,
    finalized: bool,
}

impl LiveMetrics {
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    pub fn start_at(now: Instant) -> Self {
        Self {
            started_at: now,
            first_token_at: None,
            updated_at: now,
            response: String::new(),
            estimated_tokens: 0,
            token_count: None,
            finalized: false,
        }
    }

    /// Records the first-content instant. Idempotent: later calls no-op.
    pub fn mark_first_token(&mut self) {
        self.mark_first_token_at(Instant::now());
    }

    pub fn mark_first_token_at(&mut self, now: Instant) {
        if self.finalized || self.first_token_at.is_some() {
            return;
        }
        self.first_token_at = Some(now.max(self.started_at));
        self.bump(now);
    }

    pub fn append_delta(&mut self, text: &str) {
        self.append_delta_at(text, Instant::now());
    }

    pub fn append_delta_at(&mut self, text: &str, now: Instant) {
        if self.finalized {
            return;
        }
        self.response.push_str(text);
        self.estimated_tokens = estimate_tokens(&self.response);
        self.bump(now);
    }

    /// Service-reported count; takes precedence over the running estimate.
    pub fn set_token_count(&mut self, n: u64) {
        if self.finalized {
            return;
        }
        self.token_count = Some(n);
    }

    /// Bumps the live clock without any content change.
    pub fn touch(&mut self) {
        self.touch_at(Instant::now());
    }

    pub fn touch_at(&mut self, now: Instant) {
        if self.finalized {
            return;
        }
        self.bump(now);
    }

    /// Terminal state. A provided text replaces the accumulated response
    /// wholesale; a provided count becomes authoritative.
    pub fn finalize(&mut self, text: Option<String>, count: Option<u64>) {
        self.finalize_at(text, count, Instant::now());
    }

    pub fn finalize_at(&mut self, text: Option<String>, count: Option<u64>, now: Instant) {
        if self.finalized {
            return;
        }
        if let Some(text) = text {
            self.response = text;
            self.estimated_tokens = estimate_tokens(&self.response);
        }
        if let Some(count) = count {
            self.token_count = Some(count);
        }
        self.bump(now);
        self.finalized = true;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_elapsed = self
            .updated_at
            .saturating_duration_since(self.started_at)
            .as_secs_f64();
        let prompt_delay = self
            .first_token_at
            .map(|t| t.saturating_duration_since(self.started_at).as_secs_f64())
            .unwrap_or(0.0);
        let generation_time = self
            .first_token_at
            .map(|t| self.updated_at.saturating_duration_since(t).as_secs_f64())
            .unwrap_or(0.0);
        let total_tokens = self.token_count.unwrap_or(self.estimated_tokens);

        // Throughput defaults to 0 whenever its denominator is not positive.
        let tokens_per_second = if generation_time > 0.0 {
            total_tokens as f64 / generation_time
        } else {
            0.0
        };
        let request_tokens_per_second = if total_elapsed > 0.0 {
            total_tokens as f64 / total_elapsed
        } else {
            0.0
        };

        MetricsSnapshot {
            total_elapsed,
            prompt_delay,
            generation_time,
            total_tokens,
            tokens_per_second,
            request_tokens_per_second,
            first_token_seen: self.first_token_at.is_some(),
            finalized: self.finalized,
            response: self.response.clone(),
        }
    }

    // updated_at never moves backwards
    fn bump(&mut self, now: Instant) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

/// Immutable view of a LiveMetrics at one instant, with every derived
/// value materialized. What the view renders and finalization consumes.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_elapsed: f64,
    pub prompt_delay: f64,
    pub generation_time: f64,
    pub total_tokens: u64,
    pub tokens_per_second: f64,
    pub request_tokens_per_second: f64,
    pub first_token_seen: bool,
    pub finalized: bool,
    pub response: String,
}

/// Finalized result of one prompt job. Derived once, never recomputed.
#[derive(Debug, Clone)]
pub struct BenchmarkMetrics {
    pub total_time: f64,
    pub prompt_delay_time: f64,
    pub generation_time: f64,
    pub total_tokens: u64,
    pub tokens_per_second: f64,
    pub request_tokens_per_second: f64,
    pub prompt_name: String,
    pub service_name: String,
}

impl BenchmarkMetrics {
    pub fn from_snapshot(
        snapshot: &MetricsSnapshot,
        prompt_name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            total_time: snapshot.total_elapsed,
            prompt_delay_time: snapshot.prompt_delay,
            generation_time: snapshot.generation_time,
            total_tokens: snapshot.total_tokens,
            tokens_per_second: snapshot.tokens_per_second,
            request_tokens_per_second: snapshot.request_tokens_per_second,
            prompt_name: prompt_name.into(),
            service_name: service_name.into(),
        }
    }
}

/// Arithmetic mean of each numeric field across a session's completed runs.
/// Only reported when at least two runs completed.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub runs: usize,
    pub avg_total_time: f64,
    pub avg_prompt_delay_time: f64,
    pub avg_generation_time: f64,
    pub avg_total_tokens: f64,
    pub avg_tokens_per_second: f64,
    pub avg_request_tokens_per_second: f64,
}

impl SessionSummary {
    pub fn from_metrics(metrics: &[BenchmarkMetrics]) -> Option<Self> {
        if metrics.len() < 2 {
            return None;
        }
        let n = metrics.len() as f64;
        Some(Self {
            runs: metrics.len(),
            avg_total_time: metrics.iter().map(|m| m.total_time).sum::<f64>() / n,
            avg_prompt_delay_time: metrics.iter().map(|m| m.prompt_delay_time).sum::<f64>() / n,
            avg_generation_time: metrics.iter().map(|m| m.generation_time).sum::<f64>() / n,
            avg_total_tokens: metrics.iter().map(|m| m.total_tokens as f64).sum::<f64>() / n,
            avg_tokens_per_second: metrics.iter().map(|m| m.tokens_per_second).sum::<f64>() / n,
            avg_request_tokens_per_second: metrics
                .iter()
                .map(|m| m.request_tokens_per_second)
                .sum::<f64>()
                / n,
        })
    }
}

/// Outcome of one session: what was attempted, what completed, where the
/// log landed.
#[derive(Debug)]
pub struct SessionReport {
    pub attempted: usize,
    pub completed: Vec<BenchmarkMetrics>,
    pub summary: Option<SessionSummary>,
    pub log_path: Option<PathBuf>,
    pub cancelled: bool,
}
