//! Error types for the assist engine.
//!
//! Each concern gets its own `thiserror` enum; [`AssistError`] aggregates them
//! for the coordinator, which is the only place they are mapped to
//! user-facing messages.

use std::time::Duration;

use crate::suggestion::SuggestionStatus;

/// Errors from validating, ordering or applying an edit list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Malformed coordinates (line or column 0).
    #[error("invalid edit {edit_index}: {reason}")]
    Validation { edit_index: usize, reason: String },

    /// A position that lies beyond the document.
    #[error("edit {edit_index} is out of range: line {line}, column {column}")]
    OutOfRange {
        edit_index: usize,
        line: usize,
        column: usize,
    },

    /// Two edits replace overlapping spans.
    #[error("edits {first} and {second} overlap")]
    Order { first: usize, second: usize },

    /// `old_content` does not match the live document.
    #[error("conflict at edit {edit_index}: expected {expected:?}, found {actual:?}")]
    Conflict {
        edit_index: usize,
        expected: String,
        actual: String,
    },
}

/// A malformed or schema-invalid LLM response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("invalid response JSON: {0}")]
    Json(String),

    #[error("suggestion {index}: unknown type {kind:?}")]
    UnknownKind { index: usize, kind: String },

    #[error("suggestion {index}: {reason}")]
    Invalid { index: usize, reason: String },
}

/// Errors from the LLM transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication failed (check API key): {0}")]
    Auth(String),

    #[error("request rejected {status}: {message}")]
    Client { status: u16, message: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether a retry with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_)
                | TransportError::Timeout
                | TransportError::Server { .. }
                | TransportError::RateLimited { .. }
        )
    }

    /// Server-requested delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }

    /// Map an HTTP status and body to a transport error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => TransportError::Auth(message),
            408 => TransportError::Timeout,
            429 => TransportError::RateLimited {
                retry_after_secs: 0,
            },
            500..=599 => TransportError::Server { status, message },
            _ => TransportError::Client { status, message },
        }
    }
}

/// Errors at the document boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document is read-only while a suggestion is being applied")]
    ReadOnly,
}

/// Top-level error returned by the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    #[error("document too large: {tokens} tokens exceeds the {limit} token limit")]
    BudgetExceeded { tokens: u32, limit: u32 },

    #[error("unknown suggestion: {0}")]
    UnknownSuggestion(String),

    #[error("suggestion {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: SuggestionStatus,
        to: SuggestionStatus,
    },

    #[error("a suggestion request is already in flight")]
    RequestInFlight,

    #[error("a suggestion is being applied")]
    Applying,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}
