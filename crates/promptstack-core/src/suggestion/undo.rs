//! Snapshot-based undo/redo for applied suggestions.
//!
//! An undo action keeps the full pre-apply text rather than an inverse edit
//! list. Undo restores the snapshot; redo re-applies the recorded edits to it.

use uuid::Uuid;

use crate::document::CursorPos;

use super::model::Edit;

pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// One applied suggestion, as recorded for undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoAction {
    pub batch_id: Uuid,
    /// Id of the suggestion that produced the batch.
    pub suggestion_id: String,
    /// Document text before the edits were applied.
    pub snapshot: String,
    pub edits: Vec<Edit>,
    pub cursor_before: CursorPos,
    pub cursor_after: CursorPos,
}

impl UndoAction {
    pub fn new(
        suggestion_id: impl Into<String>,
        snapshot: String,
        edits: Vec<Edit>,
        cursor_before: CursorPos,
        cursor_after: CursorPos,
    ) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            suggestion_id: suggestion_id.into(),
            snapshot,
            edits,
            cursor_before,
            cursor_after,
        }
    }
}

/// Bounded undo history with a redo stack.
#[derive(Debug, Clone)]
pub struct UndoStack {
    undo: Vec<UndoAction>,
    redo: Vec<UndoAction>,
    max_depth: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

impl UndoStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record a new action. Clears the redo stack and drops the oldest entry when full.
    pub fn push(&mut self, action: UndoAction) {
        self.redo.clear();
        if self.undo.len() == self.max_depth {
            self.undo.remove(0);
        }
        self.undo.push(action);
    }

    /// Take the most recent action for undoing; it moves to the redo stack.
    pub fn undo(&mut self) -> Option<&UndoAction> {
        let action = self.undo.pop()?;
        self.redo.push(action);
        self.redo.last()
    }

    /// Take the most recently undone action for redoing; it moves back to the undo stack.
    pub fn redo(&mut self) -> Option<&UndoAction> {
        let action = self.redo.pop()?;
        self.undo.push(action);
        self.undo.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
