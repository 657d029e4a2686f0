//! The suggestion/undo coordinator.
//!
//! Owns the suggestion list, the undo stack and the document handle. Every
//! document mutation happens here, on the caller's task; the only concurrent
//! piece is the spawned request, which reports back through
//! [`Coordinator::handle_event`].
//!
//! ```text
//!            request_suggestions            handle_event
//!  document ───────────────────▶ [task] ──AssistEvent──▶ suggestions
//!     ▲                                                     │
//!     └──────────── apply / undo / redo ◀───────────────────┘
//! ```

use std::sync::Arc;

use promptstack_config::AppConfig;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::context::{
    CandidateSource, ContextAssembler, ContextSource, DocumentMeta, Selection, TokenBudget,
};
use crate::document::{DocumentProvider, position_of};
use crate::error::{AssistError, EditError};
use crate::keywords::extract_keywords;
use crate::llm::{AssistEvent, RequestHandle, RetryPolicy, SuggestionTransport, spawn_request};
use crate::models::ModelRegistry;
use crate::suggestion::apply::apply_with_spans;
use crate::suggestion::undo::DEFAULT_UNDO_DEPTH;
use crate::suggestion::{
    DEFAULT_CONTEXT_LINES, Suggestion, SuggestionRequest, SuggestionStatus, SuggestionsResponse,
    UndoAction, UndoStack, UnifiedDiff, apply_edits, generate_unified_diff,
};

/// Shown on a suggestion whose edits no longer match the document.
pub const CONFLICT_MESSAGE: &str = "document changed since suggestion was generated, please regenerate";

/// Injected collaborators and limits for a [`Coordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub budget: TokenBudget,
    pub assembler: ContextAssembler,
    pub retry: RetryPolicy,
    pub diff_context_lines: usize,
    pub undo_depth: usize,
}

impl CoordinatorConfig {
    /// Defaults for everything but the budget.
    pub fn new(budget: TokenBudget) -> Self {
        Self {
            budget,
            assembler: ContextAssembler::default(),
            retry: RetryPolicy::default(),
            diff_context_lines: DEFAULT_CONTEXT_LINES,
            undo_depth: DEFAULT_UNDO_DEPTH,
        }
    }

    pub fn from_app_config(config: &AppConfig, models: &ModelRegistry) -> Self {
        let window = models.context_window_size(&config.model.name);
        Self {
            budget: TokenBudget::new(window, (&config.budget).into()),
            assembler: ContextAssembler::from_config(&config.context),
            retry: RetryPolicy::from_config(&config.llm),
            diff_context_lines: config.context.diff_context_lines,
            undo_depth: DEFAULT_UNDO_DEPTH,
        }
    }
}

/// Suggestion lifecycle, apply and undo for one document.
pub struct Coordinator {
    document: Box<dyn DocumentProvider>,
    config: CoordinatorConfig,
    transport: Arc<dyn SuggestionTransport>,
    library: Box<dyn CandidateSource>,
    history: Box<dyn CandidateSource>,
    clock: Arc<dyn Clock>,
    suggestions: Vec<Suggestion>,
    summary: Option<String>,
    selection: Selection,
    undo: UndoStack,
    in_flight: Option<RequestHandle>,
    events: mpsc::UnboundedSender<AssistEvent>,
}

impl Coordinator {
    /// Create a coordinator and the receiving end of its event channel.
    ///
    /// The caller's loop should forward every received event to
    /// [`Coordinator::handle_event`].
    pub fn new(
        document: Box<dyn DocumentProvider>,
        config: CoordinatorConfig,
        transport: Arc<dyn SuggestionTransport>,
        library: Box<dyn CandidateSource>,
        history: Box<dyn CandidateSource>,
    ) -> (Self, mpsc::UnboundedReceiver<AssistEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let undo = UndoStack::new(config.undo_depth);
        let coordinator = Self {
            document,
            config,
            transport,
            library,
            history,
            clock: Arc::new(SystemClock),
            suggestions: Vec::new(),
            summary: None,
            selection: Selection::default(),
            undo,
            in_flight: None,
            events: tx,
        };
        (coordinator, rx)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ── Requests ──────────────────────────────────────────────────────

    /// Assemble context and spawn a suggestion request for the current document.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_suggestions(&mut self, meta: &DocumentMeta) -> Result<Uuid, AssistError> {
        let text = self.document.text();
        let check = self.config.budget.check_document(&text);
        if check.at_block {
            warn!(tokens = check.tokens, limit = check.limit, "Document over budget, request blocked");
            return Err(AssistError::BudgetExceeded {
                tokens: check.tokens,
                limit: check.limit,
            });
        }
        if self.is_applying() {
            return Err(AssistError::Applying);
        }
        if self.in_flight.is_some() {
            return Err(AssistError::RequestInFlight);
        }

        let keywords = extract_keywords(&text);
        let library = self.library.list_candidates();
        let history = self.history.list_candidates();
        let selection = self.config.assembler.assemble(
            &keywords,
            meta,
            &library,
            &history,
            &self.config.budget,
            self.clock.now(),
        );
        debug!(
            keywords = keywords.len(),
            library = selection.library.len(),
            history = selection.history.len(),
            context_tokens = selection.total_tokens,
            "Context assembled"
        );

        let request = SuggestionRequest::new(&text, &selection);
        self.selection = selection;
        let handle = spawn_request(
            Arc::clone(&self.transport),
            request,
            self.config.retry,
            Arc::clone(&self.clock),
            self.events.clone(),
        );
        let id = handle.id;
        self.in_flight = Some(handle);
        info!(request_id = %id, "Suggestion request started");
        Ok(id)
    }

    /// Cancel the outstanding request, if any. Its `Cancelled` event still
    /// arrives and is ignored.
    pub fn cancel_request(&mut self) -> bool {
        match self.in_flight.take() {
            Some(handle) => {
                handle.cancel();
                info!(request_id = %handle.id, "Suggestion request cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_request_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Consume one event from the request task.
    ///
    /// Returns the number of new suggestions. Events from superseded or
    /// cancelled requests are dropped.
    pub fn handle_event(&mut self, event: AssistEvent) -> Result<usize, AssistError> {
        let current = self.in_flight.as_ref().map(|handle| handle.id);
        if current != Some(event.request_id()) {
            debug!(request_id = %event.request_id(), "Ignoring stale request event");
            return Ok(0);
        }
        self.in_flight = None;

        match event {
            AssistEvent::SuggestionsReady { response, .. } => Ok(self.load_suggestions(response)),
            AssistEvent::RequestFailed { error, .. } => {
                error!(error = %error, "Suggestion request failed");
                Err(error)
            }
            AssistEvent::Cancelled { .. } => Ok(0),
        }
    }

    /// Replace the suggestion list with a parsed response.
    pub fn load_suggestions(&mut self, response: SuggestionsResponse) -> usize {
        let count = response.suggestions.len();
        self.suggestions = response.suggestions;
        self.summary = response.summary;
        info!(count, "Suggestions loaded");
        count
    }

    // ── Suggestion lifecycle ──────────────────────────────────────────

    /// Apply a pending suggestion to the document.
    ///
    /// The document is read-only for the duration and is always unlocked
    /// afterwards. On failure the suggestion moves to `error` and the
    /// document is left untouched.
    pub fn apply(&mut self, id: &str) -> Result<(), AssistError> {
        let index = self.index_of(id)?;
        let suggestion = &mut self.suggestions[index];
        suggestion.mark_applying()?;

        self.document.set_read_only(true);
        let snapshot = self.document.text();
        let cursor_before = self.document.cursor();

        match apply_with_spans(&snapshot, &suggestion.edits) {
            Ok(applied) => {
                let cursor_after = applied
                    .spans
                    .last()
                    .map_or(cursor_before, |span| position_of(&applied.text, span.new_end));
                self.document.apply_mutation(applied.text);
                self.document.set_cursor(cursor_after);
                self.undo.push(UndoAction::new(
                    suggestion.id.clone(),
                    snapshot,
                    suggestion.edits.clone(),
                    cursor_before,
                    cursor_after,
                ));
                let result = suggestion.mark_applied(self.clock.now());
                self.document.set_read_only(false);
                info!(
                    suggestion_id = %suggestion.id,
                    edits = suggestion.edits.len(),
                    "Suggestion applied"
                );
                result
            }
            Err(e) => {
                let message = user_message(&e);
                match &e {
                    EditError::Conflict { .. } => {
                        warn!(suggestion_id = %suggestion.id, error = %e, "Suggestion conflicts with document")
                    }
                    _ => error!(suggestion_id = %suggestion.id, error = %e, "Suggestion could not be applied"),
                }
                let result = suggestion.mark_error(message);
                self.document.set_read_only(false);
                result?;
                Err(e.into())
            }
        }
    }

    /// Dismiss a pending suggestion.
    pub fn dismiss(&mut self, id: &str) -> Result<(), AssistError> {
        let index = self.index_of(id)?;
        self.suggestions[index].mark_dismissed()?;
        debug!(suggestion_id = id, "Suggestion dismissed");
        Ok(())
    }

    /// Unified diff of what applying `id` would do to the current document.
    pub fn preview(&self, id: &str) -> Result<UnifiedDiff, AssistError> {
        let suggestion = &self.suggestions[self.index_of(id)?];
        let diff = generate_unified_diff(
            &self.document.text(),
            &suggestion.edits,
            self.config.diff_context_lines,
        )?;
        Ok(diff)
    }

    // ── Undo / redo ───────────────────────────────────────────────────

    /// Restore the document to before the most recent apply.
    pub fn undo(&mut self) -> Result<(), AssistError> {
        if self.is_applying() {
            return Err(AssistError::Applying);
        }
        let action = self.undo.undo().ok_or(AssistError::NothingToUndo)?;
        self.document.apply_mutation(action.snapshot.clone());
        self.document.set_cursor(action.cursor_before);
        info!(batch_id = %action.batch_id, suggestion_id = %action.suggestion_id, "Undo");
        Ok(())
    }

    /// Re-apply the most recently undone batch.
    pub fn redo(&mut self) -> Result<(), AssistError> {
        if self.is_applying() {
            return Err(AssistError::Applying);
        }
        let action = self.undo.redo().ok_or(AssistError::NothingToRedo)?;
        let text = apply_edits(&action.snapshot, &action.edits)?;
        self.document.apply_mutation(text);
        self.document.set_cursor(action.cursor_after);
        info!(batch_id = %action.batch_id, suggestion_id = %action.suggestion_id, "Redo");
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    // ── Accessors ─────────────────────────────────────────────────────

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn suggestion(&self, id: &str) -> Option<&Suggestion> {
        self.suggestions.iter().find(|s| s.id == id)
    }

    /// Summary line from the last response.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Context sent with the last request.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.config.budget
    }

    /// Status-bar lines: document, then library and history context.
    pub fn budget_status(&self) -> Vec<String> {
        let budget = &self.config.budget;
        vec![
            budget.document_status(&self.document.text()),
            budget.context_status(&self.selection.library, ContextSource::Library),
            budget.context_status(&self.selection.history, ContextSource::History),
        ]
    }

    pub fn document(&self) -> &dyn DocumentProvider {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> &mut dyn DocumentProvider {
        self.document.as_mut()
    }

    fn is_applying(&self) -> bool {
        self.suggestions
            .iter()
            .any(|s| s.status == SuggestionStatus::Applying)
    }

    fn index_of(&self, id: &str) -> Result<usize, AssistError> {
        self.suggestions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AssistError::UnknownSuggestion(id.to_string()))
    }
}

fn user_message(error: &EditError) -> String {
    match error {
        EditError::Conflict { .. } => CONFLICT_MESSAGE.to_string(),
        other => other.to_string(),
    }
}
