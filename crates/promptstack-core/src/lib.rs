#![deny(unsafe_code)]

//! PromptStack AI-assist engine.
//!
//! Picks relevant context for a prompt document under a token budget, asks an
//! LLM for typed edit suggestions, previews them as unified diffs and applies
//! them atomically with snapshot undo. The [`Coordinator`] ties the pieces
//! together for one document.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future: the standard return type for async
/// trait methods that require dynamic dispatch (`dyn Trait`).
///
/// Native `async fn` in traits produces opaque return types that are **not**
/// object-safe. Traits consumed via `Box<dyn Trait>` or `&dyn Trait` must
/// return a concrete `Pin<Box<dyn Future>>` instead.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Injectable wall clock.
pub mod clock;
/// Relevance scoring, token budgeting and context assembly.
pub mod context;
/// Suggestion lifecycle, apply and undo for one document.
pub mod coordinator;
/// The document boundary and an in-memory buffer.
pub mod document;
/// Error types for every concern.
pub mod error;
/// Keyword extraction from Markdown prompts.
pub mod keywords;
/// LLM providers, transport, retry and request tasks.
pub mod llm;
/// Context window sizes per model.
pub mod models;
/// Suggestion model, parsing, diffing, applying and undo history.
pub mod suggestion;

pub use clock::{Clock, SystemClock};
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use document::{Buffer, CursorPos, DocumentProvider};
pub use error::{AssistError, DocumentError, EditError, ParseError, TransportError};
pub use keywords::{KeywordSet, extract_keywords};
pub use models::ModelRegistry;
