/// One named prompt to benchmark. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct PromptJob {
    pub name: String,
    pub text: String,
}

impl PromptJob {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Canned prompts shipped with the tool.
const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        "Prompt 1",
        "Write a short story about a robot learning to paint.",
    ),
    (
        "Prompt 2",
        "Explain the concept of quantum computing in simple terms.",
    ),
    (
        "Prompt 3",
        "Create a recipe for a healthy breakfast that takes under 10 minutes to prepare.",
    ),
    (
        "Prompt 4",
        "Write a Python function that calculates the fibonacci sequence up to n numbers.",
    ),
    (
        "Prompt 5",
        "Describe what you would see on a walk through a forest in autumn.",
    ),
];

/// Insertion-ordered prompt collection. "Run all" iterates definition order.
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    entries: Vec<PromptJob>,
}

impl PromptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five canned prompts, in their fixed order.
    pub fn builtin() -> Self {
        let entries = BUILTIN_PROMPTS
            .iter()
            .map(|(name, text)| PromptJob::new(*name, *text))
            .collect();
        Self { entries }
    }

    /// Appends a prompt, replacing any existing entry with the same name
    /// in place so definition order is preserved.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let job = PromptJob::new(name, text);
        match self.entries.iter_mut().find(|e| e.name == job.name) {
            Some(existing) => existing.text = job.text,
            None => self.entries.push(job),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PromptJob> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromptJob> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_has_five_prompts_in_order() {
        let set = PromptSet::builtin();
        assert_eq!(set.len(), 5);
        assert_eq!(set.names()[0], "Prompt 1");
        assert_eq!(set.names()[4], "Prompt 5");
    }

    #[test]
    fn insert_preserves_order_and_replaces() {
        let mut set = PromptSet::builtin();
        set.insert("Custom 1", "hello");
        set.insert("Prompt 2", "replaced");
        assert_eq!(set.len(), 6);
        assert_eq!(set.names()[1], "Prompt 2");
        assert_eq!(set.get("Prompt 2").unwrap().text, "replaced");
        assert_eq!(set.names()[5], "Custom 1");
    }
}
