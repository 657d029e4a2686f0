//! Context window sizes of known models.

use std::collections::HashMap;

use promptstack_config::ModelConfig;

/// Built-in context windows, in tokens.
const KNOWN_MODELS: &[(&str, u32)] = &[
    ("claude-opus-4-20250514", 200_000),
    ("claude-sonnet-4-20250514", 200_000),
    ("claude-3-7-sonnet-20250219", 200_000),
    ("claude-3-5-sonnet-20241022", 200_000),
    ("claude-3-5-sonnet-20240620", 200_000),
    ("claude-3-5-haiku-20241022", 200_000),
    ("claude-3-opus-20240229", 200_000),
    ("claude-3-sonnet-20240229", 200_000),
    ("claude-3-haiku-20240307", 200_000),
    ("gpt-4o", 128_000),
    ("gpt-4o-mini", 128_000),
    ("gpt-4-turbo", 128_000),
];

/// Maps model names to context window sizes.
///
/// Unknown models fall back to the largest known window.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    windows: HashMap<String, u32>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            windows: KNOWN_MODELS
                .iter()
                .map(|(name, size)| (name.to_string(), *size))
                .collect(),
        }
    }
}

impl ModelRegistry {
    /// Built-in table plus the overrides from `[model.context_windows]`.
    pub fn from_config(config: &ModelConfig) -> Self {
        let mut registry = Self::default();
        for (name, size) in &config.context_windows {
            registry.insert(name.clone(), *size);
        }
        registry
    }

    pub fn insert(&mut self, model: impl Into<String>, window: u32) {
        self.windows.insert(model.into(), window);
    }

    pub fn is_known(&self, model: &str) -> bool {
        self.windows.contains_key(model)
    }

    pub fn context_window_size(&self, model: &str) -> u32 {
        self.windows
            .get(model)
            .copied()
            .unwrap_or_else(|| self.fallback())
    }

    fn fallback(&self) -> u32 {
        self.windows.values().copied().max().unwrap_or(200_000)
    }
}
