//! Persistent user-defined prompts, kept in a small JSON map next to the
//! working directory, merged after the built-in canned set.

use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::warn;

use tokengauge_core::PromptSet;

const PROMPTS_FILE: &str = "custom_prompts.json";

pub struct CustomPromptStore {
    path: PathBuf,
    prompts: Map<String, Value>,
}

impl CustomPromptStore {
    pub fn load() -> Self {
        Self::load_from(PathBuf::from(PROMPTS_FILE))
    }

    pub fn load_from(path: PathBuf) -> Self {
        let prompts = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Could not parse {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                Map::new()
            }
        };
        Self { path, prompts }
    }

    /// Adds a prompt under the next free `Custom N` name and persists.
    pub fn add(&mut self, text: &str) -> anyhow::Result<String> {
        let mut n = self.prompts.len() + 1;
        let mut name = format!("Custom {}", n);
        while self.prompts.contains_key(&name) {
            n += 1;
            name = format!("Custom {}", n);
        }
        self.prompts
            .insert(name.clone(), Value::String(text.to_string()));
        self.save()?;
        Ok(name)
    }

    pub fn remove(&mut self, name: &str) -> anyhow::Result<bool> {
        let removed = self.prompts.remove(name).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prompts
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.as_str()?)))
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Appends every custom prompt to `set`, in file order.
    pub fn merge_into(&self, set: &mut PromptSet) {
        for (name, text) in self.entries() {
            set.insert(name, text);
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(&self.prompts)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}
