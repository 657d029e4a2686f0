//! Prompt construction for suggestion requests.

use std::fmt::Write as _;

use crate::context::{ContextSource, ScoredItem, Selection};

pub const SYSTEM_PROMPT: &str = r#"You help people improve prompts they are writing. Read the document and propose concrete, minimal improvements.

Every suggestion has one of these types:
- recommendation: pull in a relevant library prompt from the provided context
- gap: missing context or information that would make the prompt more effective
- formatting: better structure or organization of the content
- contradiction: conflicting instructions or requirements
- clarity: unclear or ambiguous instructions
- reformatting: an alternative structure with better flow

Edits address the document exactly as numbered below. "line" and "column" are 1-indexed and count characters, not bytes. "old_content" must be copied verbatim from the document at that position; use an empty "old_content" to insert. Edits within one suggestion must not overlap.

Reply with a single JSON object and nothing else:
{
  "suggestions": [
    {
      "type": "clarity",
      "title": "Short title",
      "description": "Why this helps",
      "edits": [
        {"line": 1, "column": 1, "old_content": "text to replace", "new_content": "replacement"}
      ]
    }
  ],
  "summary": "One sentence on the overall state of the prompt"
}

Be conservative. Only suggest changes that clearly improve the prompt. An empty "suggestions" list is a valid answer."#;

/// A context item rendered into the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnippet {
    pub source: ContextSource,
    pub id: String,
    pub title: String,
    pub content: String,
}

impl ContextSnippet {
    fn from_scored(source: ContextSource, scored: &ScoredItem) -> Self {
        Self {
            source,
            id: scored.item.id.clone(),
            title: scored.item.title.clone(),
            content: scored.item.content.clone(),
        }
    }
}

/// Everything a transport needs to ask for suggestions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub system_prompt: String,
    pub context: Vec<ContextSnippet>,
    /// The document, line-numbered.
    pub document_excerpt: String,
}

impl SuggestionRequest {
    pub fn new(document: &str, selection: &Selection) -> Self {
        let context = selection
            .library
            .iter()
            .map(|item| ContextSnippet::from_scored(ContextSource::Library, item))
            .chain(
                selection
                    .history
                    .iter()
                    .map(|item| ContextSnippet::from_scored(ContextSource::History, item)),
            )
            .collect();

        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            context,
            document_excerpt: number_lines(document),
        }
    }

    /// The user turn: context items, then the numbered document.
    pub fn user_message(&self) -> String {
        let mut out = String::new();
        if !self.context.is_empty() {
            out.push_str("## Context\n\n");
            for snippet in &self.context {
                let _ = writeln!(
                    out,
                    "### {} ({}: {})\n{}\n",
                    snippet.title,
                    snippet.source.label(),
                    snippet.id,
                    snippet.content.trim_end()
                );
            }
        }
        out.push_str("## Document\n\n");
        out.push_str(&self.document_excerpt);
        out
    }
}

/// Prefix each line with its 1-indexed number, right-aligned.
pub fn number_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let width = lines.len().to_string().len();
    let mut out = String::with_capacity(text.len() + lines.len() * (width + 3));
    for (i, line) in lines.iter().enumerate() {
        let _ = writeln!(out, "{:>width$} | {}", i + 1, line);
    }
    out
}
