//! HTTP-probe discovery of local services and remote-server kind
//! detection.

use std::time::Duration;

use tracing::{debug, info};

use tokengauge_core::ServiceKind;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing one host: what it looks like and whether its API
/// answered.
#[derive(Debug, Clone)]
pub struct DetectedService {
    pub kind: ServiceKind,
    pub base_url: String,
    pub responding: bool,
}

impl DetectedService {
    pub fn status(&self) -> &'static str {
        if self.responding {
            "Available"
        } else {
            "Not responding"
        }
    }
}

/// Host for a service kind, env-overridable like the rest of the config.
pub fn host_for(kind: ServiceKind) -> String {
    let env_var = match kind {
        ServiceKind::Ollama => "OLLAMA_HOST",
        ServiceKind::Vllm => "VLLM_HOST",
        ServiceKind::LlamaCpp => "LLAMACPP_HOST",
        ServiceKind::Unknown => return String::new(),
    };
    std::env::var(env_var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| kind.default_host().unwrap_or_default().to_string())
}

fn probe_path(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Ollama => "/api/tags",
        ServiceKind::Vllm => "/v1/models",
        ServiceKind::LlamaCpp => "/health",
        ServiceKind::Unknown => "/",
    }
}

pub struct ServiceProbe {
    http: reqwest::Client,
}

impl ServiceProbe {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?,
        })
    }

    /// Probes the three known service kinds on their local hosts.
    pub async fn detect_local(&self) -> Vec<DetectedService> {
        let mut found = Vec::new();
        for kind in [ServiceKind::Ollama, ServiceKind::Vllm, ServiceKind::LlamaCpp] {
            let base_url = host_for(kind);
            let responding = self.probe(&base_url, probe_path(kind), &[]).await;
            debug!("Probe {} at {}: responding={}", kind, base_url, responding);
            if responding {
                found.push(DetectedService {
                    kind,
                    base_url,
                    responding,
                });
            }
        }
        info!("Detected {} local service(s)", found.len());
        found
    }

    /// Probes one known service; used by `status` to report every kind.
    pub async fn probe_kind(&self, kind: ServiceKind) -> DetectedService {
        let base_url = host_for(kind);
        let responding = self.probe(&base_url, probe_path(kind), &[]).await;
        DetectedService {
            kind,
            base_url,
            responding,
        }
    }

    /// Identifies what is running at a remote URL by probing each kind's
    /// characteristic endpoint in turn.
    pub async fn detect_remote(
        &self,
        base_url: &str,
        headers: &[(String, String)],
    ) -> DetectedService {
        let candidates: &[(&str, ServiceKind)] = &[
            ("/api/tags", ServiceKind::Ollama),
            ("/v1/models", ServiceKind::Vllm),
            ("/health", ServiceKind::LlamaCpp),
            ("/completion", ServiceKind::LlamaCpp),
        ];

        for (path, kind) in candidates {
            if let Some(status) = self.probe_status(base_url, path, headers).await {
                // 401/403 still identify the service; auth comes later
                if status.is_success() || status.as_u16() == 401 || status.as_u16() == 403 {
                    info!("Remote server at {} looks like {}", base_url, kind);
                    return DetectedService {
                        kind: *kind,
                        base_url: base_url.to_string(),
                        responding: status.is_success(),
                    };
                }
            }
        }

        DetectedService {
            kind: ServiceKind::Unknown,
            base_url: base_url.to_string(),
            responding: false,
        }
    }

    async fn probe(&self, base_url: &str, path: &str, headers: &[(String, String)]) -> bool {
        self.probe_status(base_url, path, headers)
            .await
            .map(|s| s.is_success())
            .unwrap_or(false)
    }

    async fn probe_status(
        &self,
        base_url: &str,
        path: &str,
        headers: &[(String, String)],
    ) -> Option<reqwest::StatusCode> {
        let mut request = self.http.get(format!("{}{}", base_url, path));
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request.send().await.ok().map(|r| r.status())
    }
}
