//! Per-service decoding of streaming lines and non-streaming bodies.
//!
//! Decoding is total: a malformed or empty line yields `Skip`, never an
//! error, so a single corrupt line cannot abort an otherwise healthy
//! stream.

use serde::Deserialize;
use tokengauge_core::{BenchError, Result, ServiceKind};

/// What one raw line of a streaming payload decodes to.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Non-terminal content fragment.
    Delta(String),
    /// Explicit end-of-stream signal. `text` is a trailing fragment to
    /// append before finalizing (some services put content on the stop
    /// record); `tokens` is the authoritative count when reported.
    Final {
        text: Option<String>,
        tokens: Option<u64>,
    },
    /// Malformed, empty, or irrelevant line.
    Skip,
}

#[derive(Deserialize)]
struct OllamaLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct OpenAiLine {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct LlamaCppLine {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
    #[serde(default)]
    tokens_predicted: Option<u64>,
}

/// Decodes one line of a streaming response body.
pub fn decode_line(kind: ServiceKind, line: &str) -> StreamEvent {
    let line = line.trim();
    if line.is_empty() {
        return StreamEvent::Skip;
    }

    match kind {
        ServiceKind::Ollama => match serde_json::from_str::<OllamaLine>(line) {
            Ok(record) if record.done => StreamEvent::Final {
                text: (!record.response.is_empty()).then(|| record.response),
                tokens: record.eval_count,
            },
            Ok(record) if !record.response.is_empty() => StreamEvent::Delta(record.response),
            _ => StreamEvent::Skip,
        },
        ServiceKind::Vllm => {
            // SSE framing: payload lines carry a "data: " marker.
            let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
                return StreamEvent::Skip;
            };
            if payload == "[DONE]" {
                return StreamEvent::Final {
                    text: None,
                    tokens: None,
                };
            }
            match serde_json::from_str::<OpenAiLine>(payload) {
                Ok(record) => match record.choices.into_iter().next() {
                    Some(choice) if !choice.text.is_empty() => StreamEvent::Delta(choice.text),
                    _ => StreamEvent::Skip,
                },
                Err(_) => StreamEvent::Skip,
            }
        }
        ServiceKind::LlamaCpp => match serde_json::from_str::<LlamaCppLine>(line) {
            Ok(record) if record.stop => StreamEvent::Final {
                text: (!record.content.is_empty()).then(|| record.content),
                tokens: record.tokens_predicted,
            },
            Ok(record) if !record.content.is_empty() => StreamEvent::Delta(record.content),
            _ => StreamEvent::Skip,
        },
        // The engine rejects Unknown before any request is sent.
        ServiceKind::Unknown => StreamEvent::Skip,
    }
}

#[derive(Deserialize)]
struct OpenAiCompletion {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    completion_tokens: Option<u64>,
}

/// Decodes a full non-streaming response body (the fallback path) into
/// the response text and the authoritative token count when reported.
pub fn decode_completion(kind: ServiceKind, body: &str) -> Result<(String, Option<u64>)> {
    match kind {
        ServiceKind::Ollama => {
            let record: OllamaLine = serde_json::from_str(body)
                .map_err(|e| BenchError::Decode(format!("Ollama completion: {}", e)))?;
            Ok((record.response, record.eval_count))
        }
        ServiceKind::Vllm => {
            let record: OpenAiCompletion = serde_json::from_str(body)
                .map_err(|e| BenchError::Decode(format!("vLLM completion: {}", e)))?;
            let text = record
                .choices
                .into_iter()
                .next()
                .map(|c| c.text)
                .unwrap_or_default();
            let tokens = record.usage.and_then(|u| u.completion_tokens);
            Ok((text, tokens))
        }
        ServiceKind::LlamaCpp => {
            let record: LlamaCppLine = serde_json::from_str(body)
                .map_err(|e| BenchError::Decode(format!("llama.cpp completion: {}", e)))?;
            Ok((record.content, record.tokens_predicted))
        }
        ServiceKind::Unknown => Err(BenchError::UnsupportedService(
            kind.display_name().to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_delta_final_and_empty() {
        assert_eq!(
            decode_line(ServiceKind::Ollama, r#"{"response":"Hi ","done":false}"#),
            StreamEvent::Delta("Hi ".to_string())
        );
        assert_eq!(
            decode_line(
                ServiceKind::Ollama,
                r#"{"response":"","done":true,"eval_count":7}"#
            ),
            StreamEvent::Final {
                text: None,
                tokens: Some(7)
            }
        );
        assert_eq!(
            decode_line(ServiceKind::Ollama, r#"{"response":"","done":false}"#),
            StreamEvent::Skip
        );
    }

    #[test]
    fn vllm_requires_data_marker_and_honors_sentinel() {
        assert_eq!(
            decode_line(
                ServiceKind::Vllm,
                r#"data: {"choices":[{"text":"hello"}]}"#
            ),
            StreamEvent::Delta("hello".to_string())
        );
        assert_eq!(
            decode_line(ServiceKind::Vllm, "data: [DONE]"),
            StreamEvent::Final {
                text: None,
                tokens: None
            }
        );
        // no marker, no event
        assert_eq!(
            decode_line(ServiceKind::Vllm, r#"{"choices":[{"text":"hello"}]}"#),
            StreamEvent::Skip
        );
        assert_eq!(
            decode_line(ServiceKind::Vllm, r#"data: {"choices":[{"text":""}]}"#),
            StreamEvent::Skip
        );
    }

    #[test]
    fn llamacpp_uses_stop_flag_and_predicted_count() {
        assert_eq!(
            decode_line(ServiceKind::LlamaCpp, r#"{"content":"chunk","stop":false}"#),
            StreamEvent::Delta("chunk".to_string())
        );
        assert_eq!(
            decode_line(
                ServiceKind::LlamaCpp,
                r#"{"content":" end","stop":true,"tokens_predicted":12}"#
            ),
            StreamEvent::Final {
                text: Some(" end".to_string()),
                tokens: Some(12)
            }
        );
    }

    #[test]
    fn malformed_lines_skip_for_every_kind() {
        for kind in [
            ServiceKind::Ollama,
            ServiceKind::Vllm,
            ServiceKind::LlamaCpp,
            ServiceKind::Unknown,
        ] {
            assert_eq!(decode_line(kind, "{not valid json"), StreamEvent::Skip);
            assert_eq!(decode_line(kind, ""), StreamEvent::Skip);
            assert_eq!(decode_line(kind, "   "), StreamEvent::Skip);
        }
    }

    #[test]
    fn completion_bodies_decode_per_kind() {
        let (text, tokens) = decode_completion(
            ServiceKind::Ollama,
            r#"{"response":"full text","eval_count":9}"#,
        )
        .unwrap();
        assert_eq!(text, "full text");
        assert_eq!(tokens, Some(9));

        let (text, tokens) = decode_completion(
            ServiceKind::Vllm,
            r#"{"choices":[{"text":"vllm says"}],"usage":{"completion_tokens":4}}"#,
        )
        .unwrap();
        assert_eq!(text, "vllm says");
        assert_eq!(tokens, Some(4));

        let (text, tokens) =
            decode_completion(ServiceKind::LlamaCpp, r#"{"content":"cpp"}"#).unwrap();
        assert_eq!(text, "cpp");
        assert_eq!(tokens, None);

        assert!(decode_completion(ServiceKind::Unknown, "{}").is_err());
        assert!(decode_completion(ServiceKind::Ollama, "{not valid json").is_err());
    }
}
