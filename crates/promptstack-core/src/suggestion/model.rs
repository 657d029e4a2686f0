//! Typed suggestions and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AssistError;

/// One positional replacement, in coordinates of the document the suggestion was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edit {
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column, in characters.
    pub column: usize,
    #[serde(default)]
    pub old_content: String,
    #[serde(default)]
    pub new_content: String,
}

impl Edit {
    pub fn new(
        line: usize,
        column: usize,
        old_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        Self {
            line,
            column,
            old_content: old_content.into(),
            new_content: new_content.into(),
        }
    }

    /// Pure insertion: nothing is replaced.
    pub fn is_insertion(&self) -> bool {
        self.old_content.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// Pull in a relevant library prompt.
    Recommendation,
    /// Missing context or information.
    Gap,
    /// Better structure or organization.
    Formatting,
    /// Conflicting instructions.
    Contradiction,
    /// Unclear or ambiguous instructions.
    Clarity,
    /// Alternative ways to structure the content.
    Reformatting,
}

impl SuggestionKind {
    pub const ALL: [SuggestionKind; 6] = [
        SuggestionKind::Recommendation,
        SuggestionKind::Gap,
        SuggestionKind::Formatting,
        SuggestionKind::Contradiction,
        SuggestionKind::Clarity,
        SuggestionKind::Reformatting,
    ];

    /// Wire name, as used in LLM responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Recommendation => "recommendation",
            SuggestionKind::Gap => "gap",
            SuggestionKind::Formatting => "formatting",
            SuggestionKind::Contradiction => "contradiction",
            SuggestionKind::Clarity => "clarity",
            SuggestionKind::Reformatting => "reformatting",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SuggestionKind::Recommendation => "Recommendation",
            SuggestionKind::Gap => "Gap Analysis",
            SuggestionKind::Formatting => "Formatting",
            SuggestionKind::Contradiction => "Contradiction",
            SuggestionKind::Clarity => "Clarity",
            SuggestionKind::Reformatting => "Reformatting",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            SuggestionKind::Recommendation => "💡",
            SuggestionKind::Gap | SuggestionKind::Clarity => "🔍",
            SuggestionKind::Formatting => "📝",
            SuggestionKind::Contradiction => "⚠️",
            SuggestionKind::Reformatting => "🔄",
        }
    }
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuggestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SuggestionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Lifecycle state of a suggestion.
///
/// `Pending → Applying → {Applied, Error}` and `Pending → Dismissed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Applying,
    Applied,
    Dismissed,
    Error,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Applying => "applying",
            SuggestionStatus::Applied => "applied",
            SuggestionStatus::Dismissed => "dismissed",
            SuggestionStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SuggestionStatus::Applied | SuggestionStatus::Dismissed | SuggestionStatus::Error
        )
    }

    pub fn can_transition_to(&self, next: SuggestionStatus) -> bool {
        matches!(
            (self, next),
            (SuggestionStatus::Pending, SuggestionStatus::Applying)
                | (SuggestionStatus::Pending, SuggestionStatus::Dismissed)
                | (SuggestionStatus::Applying, SuggestionStatus::Applied)
                | (SuggestionStatus::Applying, SuggestionStatus::Error)
        )
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An AI-proposed change made of one or more edits, applied or dismissed as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub edits: Vec<Edit>,
    pub status: SuggestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl Suggestion {
    pub fn new(
        kind: SuggestionKind,
        title: impl Into<String>,
        description: impl Into<String>,
        edits: Vec<Edit>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            description: description.into(),
            edits,
            status: SuggestionStatus::Pending,
            error: None,
            created_at,
            applied_at: None,
        }
    }

    /// Icon-prefixed title for lists.
    pub fn display_title(&self) -> String {
        format!("{} {}", self.kind.icon(), self.title)
    }

    /// Pending and carrying at least one edit.
    pub fn is_applicable(&self) -> bool {
        self.status == SuggestionStatus::Pending && !self.edits.is_empty()
    }

    pub fn mark_applying(&mut self) -> Result<(), AssistError> {
        self.transition(SuggestionStatus::Applying)
    }

    pub fn mark_applied(&mut self, at: DateTime<Utc>) -> Result<(), AssistError> {
        self.transition(SuggestionStatus::Applied)?;
        self.applied_at = Some(at);
        Ok(())
    }

    pub fn mark_dismissed(&mut self) -> Result<(), AssistError> {
        self.transition(SuggestionStatus::Dismissed)
    }

    pub fn mark_error(&mut self, message: impl Into<String>) -> Result<(), AssistError> {
        self.transition(SuggestionStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    fn transition(&mut self, next: SuggestionStatus) -> Result<(), AssistError> {
        if !self.status.can_transition_to(next) {
            return Err(AssistError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
