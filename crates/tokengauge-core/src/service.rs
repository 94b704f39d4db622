use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of generation services tokengauge knows how to talk to.
///
/// `Unknown` can be produced by remote-server probing, but every
/// request-building path rejects it before any I/O happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    Ollama,
    Vllm,
    LlamaCpp,
    Unknown,
}

impl ServiceKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Ollama => "Ollama",
            ServiceKind::Vllm => "vLLM",
            ServiceKind::LlamaCpp => "Llama.cpp",
            ServiceKind::Unknown => "Unknown",
        }
    }

    /// Default local host for each service, before env overrides.
    pub fn default_host(&self) -> Option<&'static str> {
        match self {
            ServiceKind::Ollama => Some("http://localhost:11434"),
            ServiceKind::Vllm => Some("http://localhost:8000"),
            ServiceKind::LlamaCpp => Some("http://localhost:8080"),
            ServiceKind::Unknown => None,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(ServiceKind::Ollama),
            "vllm" => Ok(ServiceKind::Vllm),
            "llamacpp" | "llama.cpp" | "llama-cpp" => Ok(ServiceKind::LlamaCpp),
            other => Err(format!(
                "unknown service '{}' (expected ollama, vllm, or llamacpp)",
                other
            )),
        }
    }
}

/// Everything the benchmark needs to know about one service endpoint.
/// Immutable for the duration of a session.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub kind: ServiceKind,
    pub base_url: String,
    /// Extra headers forwarded verbatim on every request. May be empty.
    pub auth_headers: Vec<(String, String)>,
    pub model: String,
}

impl ServiceDescriptor {
    pub fn new(kind: ServiceKind, base_url: impl Into<String>) -> Self {
        Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_headers: Vec::new(),
            model: "default".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.auth_headers = headers;
        self
    }

    pub fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_aliases() {
        assert_eq!("ollama".parse::<ServiceKind>().unwrap(), ServiceKind::Ollama);
        assert_eq!("vLLM".parse::<ServiceKind>().unwrap(), ServiceKind::Vllm);
        assert_eq!(
            "llama.cpp".parse::<ServiceKind>().unwrap(),
            ServiceKind::LlamaCpp
        );
        assert!("openai".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn descriptor_strips_trailing_slash() {
        let svc = ServiceDescriptor::new(ServiceKind::Ollama, "http://localhost:11434/");
        assert_eq!(svc.base_url, "http://localhost:11434");
        assert_eq!(svc.model, "default");
    }
}
