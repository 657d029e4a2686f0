//! The suggestion transport: one request in, one raw response string out.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::BoxFuture;
use crate::error::TransportError;
use crate::suggestion::SuggestionRequest;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};

/// Sends a suggestion request and returns the model's raw reply.
///
/// Implementations must return [`TransportError::Cancelled`] promptly once
/// `cancel` fires.
pub trait SuggestionTransport: Send + Sync {
    fn send_request<'a>(
        &'a self,
        request: &'a SuggestionRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<String, TransportError>>;
}

/// Adapts a chat [`LlmProvider`] into a [`SuggestionTransport`].
pub struct ProviderTransport<P> {
    provider: P,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl<P: LlmProvider> ProviderTransport<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn chat_request(&self, request: &SuggestionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(request.user_message())],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: Some(request.system_prompt.clone()),
        }
    }
}

impl<P: LlmProvider> SuggestionTransport for ProviderTransport<P> {
    fn send_request<'a>(
        &'a self,
        request: &'a SuggestionRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<String, TransportError>> {
        let chat = self.chat_request(request);
        Box::pin(async move {
            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                response = self.provider.chat(&chat) => response?,
            };
            debug!(
                provider = self.provider.name(),
                finish_reason = %response.finish_reason,
                total_tokens = response.usage.total_tokens,
                "Received suggestion response"
            );
            if response.content.trim().is_empty() {
                return Err(TransportError::InvalidResponse(
                    "empty response from model".to_string(),
                ));
            }
            Ok(response.content)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Selection;
    use crate::llm::types::{ChatResponse, TokenUsage};
    use std::sync::Mutex;

    /// Records the last request and answers with a fixed reply.
    struct EchoProvider {
        reply: String,
        last: Mutex<Option<ChatRequest>>,
    }

    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "Echo"
        }

        fn chat(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChatResponse, TransportError>> {
            *self.last.lock().unwrap() = Some(request.clone());
            Box::pin(async move {
                Ok(ChatResponse {
                    content: self.reply.clone(),
                    finish_reason: "stop".into(),
                    usage: TokenUsage::default(),
                    model: "echo".into(),
                })
            })
        }
    }

    /// Never answers.
    struct StalledProvider;

    impl LlmProvider for StalledProvider {
        fn name(&self) -> &str {
            "Stalled"
        }

        fn chat(&self, _request: &ChatRequest) -> BoxFuture<'_, Result<ChatResponse, TransportError>> {
            Box::pin(std::future::pending())
        }
    }

    fn echo(reply: &str) -> EchoProvider {
        EchoProvider {
            reply: reply.to_string(),
            last: Mutex::new(None),
        }
    }

    #[tokio::test]
    async fn test_builds_chat_request() {
        let transport = ProviderTransport::new(echo("{}"), "claude-sonnet-4-20250514")
            .with_max_tokens(1000)
            .with_temperature(0.2);
        let request = SuggestionRequest::new("Sort a list", &Selection::default());
        let reply = transport
            .send_request(&request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply, "{}");

        let sent = transport.provider().last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.model, "claude-sonnet-4-20250514");
        assert_eq!(sent.max_tokens, 1000);
        assert_eq!(sent.system.as_deref(), Some(request.system_prompt.as_str()));
        assert_eq!(sent.messages.len(), 1);
        assert!(sent.messages[0].content.contains("1 | Sort a list"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_invalid() {
        let transport = ProviderTransport::new(echo("  "), "m");
        let request = SuggestionRequest::new("x", &Selection::default());
        let err = transport
            .send_request(&request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_call() {
        let transport = ProviderTransport::new(StalledProvider, "m");
        let request = SuggestionRequest::new("x", &Selection::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let err = transport.send_request(&request, &cancel).await.unwrap_err();
        assert_eq!(err, TransportError::Cancelled);
    }
}
