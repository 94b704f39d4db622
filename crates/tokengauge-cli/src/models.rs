//! Model listing per service kind.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use tokengauge_core::{ServiceDescriptor, ServiceKind};

const LIST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Deserialize)]
struct PropsResponse {
    #[serde(default)]
    default_generation_settings: Option<GenerationSettings>,
}

#[derive(Deserialize)]
struct GenerationSettings {
    #[serde(default)]
    model: Option<String>,
}

/// Queries the service for the models it can serve.
pub async fn list_models(service: &ServiceDescriptor) -> anyhow::Result<Vec<String>> {
    let http = reqwest::Client::builder().timeout(LIST_TIMEOUT).build()?;

    match service.kind {
        ServiceKind::Ollama => {
            let resp: TagsResponse = get_json(&http, service, "/api/tags").await?;
            Ok(resp.models.into_iter().map(|m| m.name).collect())
        }
        ServiceKind::Vllm => {
            let resp: ModelsResponse = get_json(&http, service, "/v1/models").await?;
            Ok(resp.data.into_iter().map(|m| m.id).collect())
        }
        ServiceKind::LlamaCpp => {
            // llama.cpp serves one model at a time; /props may name it.
            let name = match get_json::<PropsResponse>(&http, service, "/props").await {
                Ok(props) => props
                    .default_generation_settings
                    .and_then(|s| s.model)
                    .unwrap_or_else(|| "current_model".to_string()),
                Err(_) => "current_model".to_string(),
            };
            Ok(vec![name])
        }
        ServiceKind::Unknown => {
            anyhow::bail!("model listing is not supported for an unidentified service")
        }
    }
}

async fn get_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    service: &ServiceDescriptor,
    path: &str,
) -> anyhow::Result<T> {
    let url = format!("{}{}", service.base_url, path);
    let mut request = http.get(&url);
    for (name, value) in &service.auth_headers {
        request = request.header(name, value);
    }
    let response = request
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?
        .error_for_status()
        .with_context(|| format!("request to {} failed", url))?;
    response
        .json()
        .await
        .with_context(|| format!("unexpected response from {}", url))
}
