//! Live terminal rendering plus the durable session log.
//!
//! The log file handle is exclusively owned by the view for the session's
//! lifetime. A failed create or write is reported once, then the sink is
//! disabled and the benchmark keeps running.

use std::fs::{self, File};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokengauge_core::{MetricsSnapshot, ServiceDescriptor};
use tracing::warn;

/// Response preview cap for the terminal; the log always gets full text.
const DISPLAY_CAP_CHARS: usize = 2000;

pub struct LiveView {
    service_name: String,
    model: String,
    host: String,
    started_at: DateTime<Local>,
    log: Option<File>,
    log_path: PathBuf,
    current_prompt: String,
    interactive: bool,
}

impl LiveView {
    /// Opens the session log under `results_dir` and writes the header.
    /// File trouble downgrades the log to a no-op sink after one warning.
    pub fn start_session(service: &ServiceDescriptor, results_dir: &Path) -> Self {
        let started_at = Local::now();
        let filename = format!(
            "benchmark_output_{}.txt",
            started_at.format("%Y%m%d_%H%M%S")
        );
        let log_path = results_dir.join(filename);

        let log = fs::create_dir_all(results_dir)
            .and_then(|_| File::create(&log_path))
            .map_err(|e| {
                warn!("Could not create session log {}: {}", log_path.display(), e);
                e
            })
            .ok();

        let mut view = Self {
            service_name: service.display_name().to_string(),
            model: service.model.clone(),
            host: service.base_url.clone(),
            started_at,
            log,
            log_path,
            current_prompt: String::new(),
            interactive: io::stdout().is_terminal(),
        };
        view.write_header();
        view
    }

    /// Suppresses terminal repaints. Used by tests and scripted runs.
    pub fn silenced(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Where the session log lives, if it could be created.
    pub fn log_path(&self) -> Option<&Path> {
        self.log.is_some().then_some(self.log_path.as_path())
    }

    pub fn start_prompt(&mut self, name: &str, text: &str) {
        self.current_prompt = name.to_string();
        let section = format!(
            "\n{}\nPROMPT: {}\n{}\nPrompt Text: {}\nStarted: {}\n\n",
            rule(60),
            name,
            rule(60),
            text,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
        );
        self.write_log(&section);
    }

    /// The only operation that repaints the screen. Touches nothing but
    /// stdout.
    pub fn update(&mut self, snapshot: &MetricsSnapshot) {
        if !self.interactive {
            return;
        }

        // ANSI clear + home
        print!("\x1B[2J\x1B[1;1H");
        println!("{}", rule(80));
        println!("LIVE BENCHMARK - {}", self.current_prompt);
        println!("Service: {} | Model: {}", self.service_name, self.model);
        println!("{}", rule(80));
        println!();
        println!("METRICS:");
        println!("Total Elapsed Time:     {:.3} seconds", snapshot.total_elapsed);

        if snapshot.first_token_seen {
            println!("Prompt Delay Time:      {:.3} seconds", snapshot.prompt_delay);
            println!("Generation Time:        {:.3} seconds", snapshot.generation_time);
        } else {
            println!("Prompt Delay Time:      [Waiting for first token...]");
            println!("Generation Time:        [Waiting for first token...]");
        }

        println!("Total Tokens Generated: {}", snapshot.total_tokens);

        if snapshot.tokens_per_second > 0.0 {
            println!("Generation Speed:       {:.2} tokens/sec", snapshot.tokens_per_second);
        } else {
            println!("Generation Speed:       [Calculating...]");
        }
        if snapshot.request_tokens_per_second > 0.0 {
            println!(
                "Overall Request Speed:  {:.2} tokens/sec",
                snapshot.request_tokens_per_second
            );
        } else {
            println!("Overall Request Speed:  [Calculating...]");
        }

        println!();
        println!("{}", rule(80));
        println!("RESPONSE:");
        println!("{}", rule(80));
        if snapshot.response.is_empty() {
            println!("[Waiting for response...]");
        } else {
            println!("{}", truncate_for_display(&snapshot.response));
        }
        println!();
        println!("{}", rule(80));

        let _ = io::stdout().flush();
    }

    /// Writes the final metrics block and full response text, flushed so
    /// the entry survives a crash immediately after.
    pub fn complete_prompt(&mut self, snapshot: &MetricsSnapshot) {
        let block = format!(
            "METRICS:\n\
             total_elapsed_time: {:.3}\n\
             prompt_delay_time: {:.3}\n\
             generation_time: {:.3}\n\
             total_tokens_generated: {}\n\
             generation_speed_tokens_per_sec: {:.2}\n\
             overall_request_speed_tokens_per_sec: {:.2}\n\
             completed_at: {}\n\n\
             RESPONSE:\n{}\n\n{}\n\n",
            snapshot.total_elapsed,
            snapshot.prompt_delay,
            snapshot.generation_time,
            snapshot.total_tokens,
            snapshot.tokens_per_second,
            snapshot.request_tokens_per_second,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            snapshot.response,
            rule(60),
        );
        self.write_log(&block);
    }

    /// Writes the footer and releases the log handle. Safe to call on
    /// every exit path, including cancellation; later calls no-op.
    pub fn end_session(&mut self) {
        let end = Local::now();
        let duration = (end - self.started_at).num_milliseconds() as f64 / 1000.0;
        let footer = format!(
            "\n\n{}\nSession completed: {}\nTotal session duration: {:.2} seconds\n{}\n",
            rule(80),
            end.format("%Y-%m-%d %H:%M:%S"),
            duration,
            rule(80),
        );
        self.write_log(&footer);
        self.log = None;
    }

    fn write_header(&mut self) {
        let header = format!(
            "{}\ntokengauge Results - {}\n{}\nService: {}\nModel: {}\nHost: {}\n{}\n\n",
            rule(80),
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            rule(80),
            self.service_name,
            self.model,
            self.host,
            rule(80),
        );
        self.write_log(&header);
    }

    fn write_log(&mut self, text: &str) {
        let Some(file) = self.log.as_mut() else {
            return;
        };
        if let Err(e) = file.write_all(text.as_bytes()).and_then(|_| file.flush()) {
            warn!(
                "Session log write failed, disabling log {}: {}",
                self.log_path.display(),
                e
            );
            self.log = None;
        }
    }
}

fn rule(width: usize) -> String {
    "=".repeat(width)
}

fn truncate_for_display(text: &str) -> String {
    match text.char_indices().nth(DISPLAY_CAP_CHARS) {
        Some((byte_idx, _)) => format!("{}\n[... truncated for display ...]", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokengauge_core::ServiceKind;

    fn snapshot(total_elapsed: f64, response: &str) -> MetricsSnapshot {
        MetricsSnapshot {
            total_elapsed,
            prompt_delay: 0.2,
            generation_time: total_elapsed - 0.2,
            total_tokens: 10,
            tokens_per_second: 5.0,
            request_tokens_per_second: 4.0,
            first_token_seen: true,
            finalized: true,
            response: response.to_string(),
        }
    }

    #[test]
    fn log_round_trip_has_sections_header_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let service =
            ServiceDescriptor::new(ServiceKind::Ollama, "http://localhost:11434").with_model("m");
        let mut view = LiveView::start_session(&service, dir.path()).silenced();
        let log_path = view.log_path().unwrap().to_path_buf();

        for i in 0..3 {
            let name = format!("Prompt {}", i + 1);
            view.start_prompt(&name, "text");
            view.update(&snapshot(1.0 + i as f64, "hello world"));
            view.complete_prompt(&snapshot(1.0 + i as f64, "hello world"));
        }
        view.end_session();

        let contents = fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.matches("PROMPT: ").count(), 3);
        assert_eq!(contents.matches("METRICS:").count(), 3);
        assert_eq!(contents.matches("tokengauge Results - ").count(), 1);
        assert_eq!(contents.matches("Session completed: ").count(), 1);

        // footer duration parses back out of the log
        let duration: f64 = contents
            .lines()
            .find_map(|l| l.strip_prefix("Total session duration: "))
            .and_then(|rest| rest.strip_suffix(" seconds"))
            .unwrap()
            .parse()
            .unwrap();
        assert!(duration >= 0.0);
    }

    #[test]
    fn prompt_headers_survive_without_metrics_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let service = ServiceDescriptor::new(ServiceKind::Vllm, "http://localhost:8000");
        let mut view = LiveView::start_session(&service, dir.path()).silenced();
        let log_path = view.log_path().unwrap().to_path_buf();

        view.start_prompt("Prompt 1", "text");
        // failed job: no complete_prompt
        view.start_prompt("Prompt 2", "text");
        view.complete_prompt(&snapshot(2.0, "answer"));
        view.end_session();

        let contents = fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.matches("PROMPT: ").count(), 2);
        assert_eq!(contents.matches("METRICS:").count(), 1);
    }

    #[test]
    fn unwritable_results_dir_disables_log_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("results");
        fs::write(&blocker, "not a directory").unwrap();

        let service = ServiceDescriptor::new(ServiceKind::Ollama, "http://localhost:11434");
        let mut view = LiveView::start_session(&service, &blocker).silenced();
        assert!(view.log_path().is_none());

        // every write path is a no-op from here on
        view.start_prompt("Prompt 1", "text");
        view.complete_prompt(&snapshot(1.0, "hi"));
        view.end_session();
    }

    #[test]
    fn display_truncation_is_char_safe() {
        let short = truncate_for_display("short");
        assert_eq!(short, "short");

        let long: String = "é".repeat(DISPLAY_CAP_CHARS + 50);
        let truncated = truncate_for_display(&long);
        assert!(truncated.ends_with("[... truncated for display ...]"));
        assert_eq!(
            truncated.chars().take_while(|c| *c == 'é').count(),
            DISPLAY_CAP_CHARS
        );
    }
}
