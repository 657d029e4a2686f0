//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use promptstack_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .model("claude-3-5-haiku-20241022")
///     .context_window("tiny-model", 400)
///     .max_retries(0)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    /// Defaults, with a dummy API key and fast backoff.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.llm.api_key = "sk-test".to_string();
        config.llm.initial_backoff_ms = 1;
        config.llm.max_backoff_ms = 5;
        Self { config }
    }

    pub fn model(mut self, name: &str) -> Self {
        self.config.model.name = name.to_string();
        self
    }

    /// Add or override a model's context window.
    pub fn context_window(mut self, model: &str, tokens: u32) -> Self {
        self.config
            .model
            .context_windows
            .insert(model.to_string(), tokens);
        self
    }

    pub fn document_cap(mut self, cap: f64) -> Self {
        self.config.budget.document_cap = cap;
        self
    }

    pub fn library_cap(mut self, cap: f64) -> Self {
        self.config.budget.library_cap = cap;
        self
    }

    pub fn history_cap(mut self, cap: f64) -> Self {
        self.config.budget.history_cap = cap;
        self
    }

    pub fn warning_threshold(mut self, threshold: f64) -> Self {
        self.config.budget.warning_threshold = threshold;
        self
    }

    pub fn max_library_items(mut self, n: usize) -> Self {
        self.config.context.max_library_items = n;
        self
    }

    pub fn max_history_items(mut self, n: usize) -> Self {
        self.config.context.max_history_items = n;
        self
    }

    pub fn diff_context_lines(mut self, n: usize) -> Self {
        self.config.context.diff_context_lines = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.llm.max_retries = n;
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.llm.base_url = Some(url.to_string());
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
