#![deny(unsafe_code)]

//! Configuration loading and validation for PromptStack.
//!
//! Loads TOML configuration files and validates them against expected ranges.
//! [`AppConfig`] is the central configuration structure; every section has
//! defaults so an empty file (or no file at all) is a valid configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Target model selection and context window overrides.
    #[serde(default)]
    pub model: ModelConfig,

    /// Token budget caps, as fractions of the model's context window.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Context selection and diff preview settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// LLM provider and transport settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which model the assistant targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent to the provider.
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Extra or overriding context window sizes, keyed by model name.
    #[serde(default)]
    pub context_windows: HashMap<String, u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            context_windows: HashMap::new(),
        }
    }
}

fn default_model_name() -> String {
    "claude-sonnet-4-20250514".to_string()
}

/// Budget caps as fractions of the context window.
///
/// The document cap is a hard block: a document estimated above it is never
/// sent. The warning threshold only drives the status bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_document_cap")]
    pub document_cap: f64,

    #[serde(default = "default_library_cap")]
    pub library_cap: f64,

    #[serde(default = "default_history_cap")]
    pub history_cap: f64,

    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            document_cap: default_document_cap(),
            library_cap: default_library_cap(),
            history_cap: default_history_cap(),
            warning_threshold: default_warning_threshold(),
        }
    }
}

fn default_document_cap() -> f64 {
    0.25
}

fn default_library_cap() -> f64 {
    0.15
}

fn default_history_cap() -> f64 {
    0.10
}

fn default_warning_threshold() -> f64 {
    0.15
}

/// Context selection limits and diff preview settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum library prompts included per request.
    #[serde(default = "default_max_library_items")]
    pub max_library_items: usize,

    /// Maximum history entries included per request.
    #[serde(default = "default_max_history_items")]
    pub max_history_items: usize,

    /// Unchanged lines shown around each diff hunk.
    #[serde(default = "default_diff_context_lines")]
    pub diff_context_lines: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_library_items: default_max_library_items(),
            max_history_items: default_max_history_items(),
            diff_context_lines: default_diff_context_lines(),
        }
    }
}

fn default_max_library_items() -> usize {
    5
}

fn default_max_history_items() -> usize {
    3
}

fn default_diff_context_lines() -> usize {
    3
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Anthropic,
}

/// LLM provider configuration.
///
/// ## TOML Example
///
/// ```toml
/// [llm]
/// provider = "anthropic"
/// api_key_env = "ANTHROPIC_API_KEY"
/// max_retries = 3
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,

    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Environment variable consulted when `api_key` is empty.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Override for the provider endpoint (proxies, tests).
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    /// Per-attempt HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            api_key: String::new(),
            api_key_env: default_api_key_env(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl LlmConfig {
    /// The API key from config, or from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), model = %config.model.name, "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "model.name must not be empty".to_string(),
            ));
        }
        for (name, window) in &self.model.context_windows {
            if *window == 0 {
                return Err(ConfigError::Validation(format!(
                    "model.context_windows[{name:?}] must be non-zero"
                )));
            }
        }

        let caps = [
            ("budget.document_cap", self.budget.document_cap),
            ("budget.library_cap", self.budget.library_cap),
            ("budget.history_cap", self.budget.history_cap),
            ("budget.warning_threshold", self.budget.warning_threshold),
        ];
        for (key, value) in caps {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be in (0.0, 1.0], got {value}"
                )));
            }
        }
        if self.budget.warning_threshold > self.budget.document_cap {
            return Err(ConfigError::Validation(format!(
                "budget.warning_threshold ({}) must not exceed budget.document_cap ({})",
                self.budget.warning_threshold, self.budget.document_cap
            )));
        }
        if self.budget.library_cap + self.budget.history_cap > 1.0 {
            return Err(ConfigError::Validation(
                "budget.library_cap + budget.history_cap must not exceed 1.0".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.llm.max_retries > 10 {
            return Err(ConfigError::Validation(format!(
                "llm.max_retries must be at most 10, got {}",
                self.llm.max_retries
            )));
        }
        if self.llm.initial_backoff_ms > self.llm.max_backoff_ms {
            return Err(ConfigError::Validation(
                "llm.initial_backoff_ms must not exceed llm.max_backoff_ms".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be in [0.0, 1.0], got {}",
                self.llm.temperature
            )));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}
