//! One spawned task per outstanding suggestion request.
//!
//! The task owns the round trip (send, retry, parse) and reports back with
//! exactly one [`AssistEvent`] on the coordinator's channel. It never touches
//! the document.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AssistError, TransportError};
use crate::suggestion::{SuggestionRequest, SuggestionsResponse, parse_suggestions_response};

use super::retry::{RetryPolicy, send_with_retry};
use super::transport::SuggestionTransport;

/// Outcome of a spawned request, delivered to the owning loop.
#[derive(Debug)]
pub enum AssistEvent {
    SuggestionsReady {
        request_id: Uuid,
        response: SuggestionsResponse,
    },
    RequestFailed {
        request_id: Uuid,
        error: AssistError,
    },
    Cancelled {
        request_id: Uuid,
    },
}

impl AssistEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            AssistEvent::SuggestionsReady { request_id, .. }
            | AssistEvent::RequestFailed { request_id, .. }
            | AssistEvent::Cancelled { request_id } => *request_id,
        }
    }
}

/// Handle to an in-flight request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    pub id: Uuid,
    cancel: CancellationToken,
}

impl RequestHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Spawn the round trip for `request` on the current tokio runtime.
pub fn spawn_request(
    transport: Arc<dyn SuggestionTransport>,
    request: SuggestionRequest,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<AssistEvent>,
) -> RequestHandle {
    let id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    debug!(request_id = %id, context_items = request.context.len(), "Spawning suggestion request");

    tokio::spawn(async move {
        let event = match send_with_retry(transport.as_ref(), &request, &policy, &token).await {
            Ok(raw) => match parse_suggestions_response(&raw, clock.now()) {
                Ok(response) => {
                    info!(
                        request_id = %id,
                        suggestions = response.suggestions.len(),
                        "Suggestions received"
                    );
                    AssistEvent::SuggestionsReady {
                        request_id: id,
                        response,
                    }
                }
                Err(e) => {
                    warn!(request_id = %id, error = %e, "Unparseable suggestion response");
                    AssistEvent::RequestFailed {
                        request_id: id,
                        error: e.into(),
                    }
                }
            },
            Err(TransportError::Cancelled) => {
                debug!(request_id = %id, "Suggestion request cancelled");
                AssistEvent::Cancelled { request_id: id }
            }
            Err(e) => {
                warn!(request_id = %id, error = %e, "Suggestion request failed");
                AssistEvent::RequestFailed {
                    request_id: id,
                    error: e.into(),
                }
            }
        };
        // The receiver may be gone if the coordinator was dropped.
        let _ = tx.send(event);
    });

    RequestHandle { id, cancel }
}
