//! Bounded exponential backoff around a [`SuggestionTransport`].

use std::time::Duration;

use promptstack_config::LlmConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::suggestion::SuggestionRequest;

use super::transport::SuggestionTransport;

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// Doubles from `initial_delay`, capped at `max_delay`. A server-provided
    /// `retry_after` raises the delay but never past the cap.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let backoff = self
            .initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        match retry_after {
            Some(after) => backoff.max(after).min(self.max_delay),
            None => backoff,
        }
    }
}

/// Send `request`, retrying retryable failures according to `policy`.
///
/// Cancellation is checked during each attempt and during each backoff sleep.
pub async fn send_with_retry(
    transport: &dyn SuggestionTransport,
    request: &SuggestionRequest,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<String, TransportError> {
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        match transport.send_request(request, cancel).await {
            Ok(raw) => {
                debug!(attempt, bytes = raw.len(), "Suggestion request succeeded");
                return Ok(raw);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt, e.retry_after());
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Suggestion request failed, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
