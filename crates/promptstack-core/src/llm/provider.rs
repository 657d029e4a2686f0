//! LLM provider trait: the core abstraction for chat completions.

use crate::BoxFuture;
use crate::error::TransportError;

use super::types::{ChatRequest, ChatResponse};

/// Core trait for LLM providers.
///
/// Implementations must be `Send + Sync` so a provider can be shared with
/// request tasks. Uses `BoxFuture` for object safety (allows `Box<dyn LlmProvider>`).
pub trait LlmProvider: Send + Sync {
    /// Provider display name (e.g. "Anthropic").
    fn name(&self) -> &str;

    /// Perform a chat completion (non-streaming).
    fn chat(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChatResponse, TransportError>>;
}

impl<P: LlmProvider + ?Sized> LlmProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn chat(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChatResponse, TransportError>> {
        (**self).chat(request)
    }
}
