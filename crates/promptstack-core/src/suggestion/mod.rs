//! Suggestions: the typed model, response parsing, diff preview, edit
//! application and undo.
//!
//! Everything in this module is synchronous. The asynchronous round trip to
//! the model lives in [`crate::llm`]; the state machine that ties the two
//! together is [`crate::coordinator::Coordinator`].

pub mod apply;
pub mod diff;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod undo;

pub use apply::{apply_edits, validate_edits};
pub use diff::{
    DEFAULT_CONTEXT_LINES, DiffHeader, DiffHunk, DiffLine, DiffLineKind, HunkRange, UnifiedDiff,
    generate_unified_diff,
};
pub use model::{Edit, Suggestion, SuggestionKind, SuggestionStatus};
pub use parse::{SuggestionsResponse, parse_suggestions_response};
pub use prompt::{ContextSnippet, SYSTEM_PROMPT, SuggestionRequest};
pub use undo::{UndoAction, UndoStack};
