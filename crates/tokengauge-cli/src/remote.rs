//! Remote-server bookkeeping: a small most-recently-used list of server
//! URLs. API keys live in memory only and are never written to disk.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

const SERVERS_FILE: &str = "remote_servers.json";
const MAX_STORED_SERVERS: usize = 10;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredServers {
    #[serde(default)]
    servers: Vec<String>,
}

/// Normalizes user input into a usable base URL: adds a scheme when
/// missing, validates the result, trims the trailing slash.
pub fn normalize_server_url(input: &str) -> anyhow::Result<String> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("empty server address");
    }
    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("http://{}", input)
    };
    let parsed = Url::parse(&with_scheme)?;
    if parsed.host_str().is_none() {
        anyhow::bail!("'{}' has no host", input);
    }
    Ok(with_scheme.trim_end_matches('/').to_string())
}

pub struct RemoteServerStore {
    path: PathBuf,
    servers: Vec<String>,
}

impl RemoteServerStore {
    pub fn load() -> Self {
        Self::load_from(PathBuf::from(SERVERS_FILE))
    }

    pub fn load_from(path: PathBuf) -> Self {
        let servers = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<StoredServers>(&contents) {
                Ok(stored) => stored.servers,
                Err(e) => {
                    warn!("Could not parse {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                Vec::new()
            }
        };
        Self { path, servers }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Moves (or inserts) a server to the front of the MRU list.
    pub fn remember(&mut self, server_url: &str) {
        self.servers.retain(|s| s != server_url);
        self.servers.insert(0, server_url.to_string());
        self.servers.truncate(MAX_STORED_SERVERS);
        if let Err(e) = self.save() {
            warn!("Could not save {}: {}", self.path.display(), e);
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        let stored = StoredServers {
            servers: self.servers.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }
}

/// Headers for an optional bearer API key, matching what most gateways
/// accept.
pub fn auth_headers(api_key: Option<&str>) -> Vec<(String, String)> {
    let Some(key) = api_key.filter(|k| !k.is_empty()) else {
        return Vec::new();
    };
    vec![
        ("Authorization".to_string(), format!("Bearer {}", key)),
        ("X-API-Key".to_string(), key.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_hosts_and_validates() {
        assert_eq!(
            normalize_server_url("192.168.10.101:11434").unwrap(),
            "http://192.168.10.101:11434"
        );
        assert_eq!(
            normalize_server_url("https://api.example.com/").unwrap(),
            "https://api.example.com"
        );
        assert!(normalize_server_url("").is_err());
        assert!(normalize_server_url("http://").is_err());
    }

    #[test]
    fn mru_list_moves_to_front_and_caps_at_ten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote_servers.json");

        let mut store = RemoteServerStore::load_from(path.clone());
        for i in 0..12 {
            store.remember(&format!("http://host{}", i));
        }
        store.remember("http://host3");

        assert_eq!(store.servers().len(), MAX_STORED_SERVERS);
        assert_eq!(store.servers()[0], "http://host3");

        let reloaded = RemoteServerStore::load_from(path);
        assert_eq!(reloaded.servers(), store.servers());
    }

    #[test]
    fn auth_headers_only_with_a_key() {
        assert!(auth_headers(None).is_empty());
        assert!(auth_headers(Some("")).is_empty());
        let headers = auth_headers(Some("k"));
        assert_eq!(headers[0].1, "Bearer k");
    }
}
