//! LLM integration: the chat provider, the suggestion transport built on top
//! of it, retry with backoff and the spawned request task.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  spawn_request   ┌──────────────────────┐
//! │ Coordinator │─────────────────▶│ tokio task           │
//! └──────▲──────┘                  │  send_with_retry     │
//!        │                         │   └ SuggestionTransport (trait)
//!        │  AssistEvent (mpsc)     │       └ ProviderTransport<P>
//!        └─────────────────────────│           └ LlmProvider (trait)
//!                                  │               └ AnthropicProvider
//!                                  └──────────────────────┘
//! ```

pub mod anthropic;
pub mod provider;
pub mod request;
pub mod retry;
pub mod transport;
pub mod types;

use std::time::Duration;

use promptstack_config::{LlmConfig, LlmProviderKind};

use crate::error::TransportError;

pub use anthropic::AnthropicProvider;
pub use provider::LlmProvider;
pub use request::{AssistEvent, RequestHandle, spawn_request};
pub use retry::{RetryPolicy, send_with_retry};
pub use transport::{ProviderTransport, SuggestionTransport};
pub use types::*;

/// Create an LLM provider from config.
///
/// Fails with [`TransportError::Auth`] when no API key is configured, so the
/// caller learns about it before the first request.
pub fn create_provider(
    config: &LlmConfig,
    model: &str,
) -> Result<Box<dyn LlmProvider>, TransportError> {
    let api_key = config.resolve_api_key().ok_or_else(|| {
        TransportError::Auth(format!(
            "no API key configured (set llm.api_key or {})",
            config.api_key_env
        ))
    })?;

    match config.provider {
        LlmProviderKind::Anthropic => {
            let mut provider = AnthropicProvider::new(api_key)
                .with_timeout(Duration::from_secs(config.timeout_secs));
            if !model.is_empty() {
                provider = provider.with_model(model);
            }
            if let Some(ref base_url) = config.base_url {
                provider = provider.with_base_url(base_url);
            }
            Ok(Box::new(provider))
        }
    }
}

/// Build the full transport stack for `model` from config.
pub fn create_transport(
    config: &LlmConfig,
    model: &str,
) -> Result<ProviderTransport<Box<dyn LlmProvider>>, TransportError> {
    let provider = create_provider(config, model)?;
    Ok(ProviderTransport::new(provider, model)
        .with_max_tokens(config.max_tokens)
        .with_temperature(config.temperature))
}
