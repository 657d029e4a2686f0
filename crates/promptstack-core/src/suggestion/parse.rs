//! Validation of raw LLM responses into typed suggestions.
//!
//! The model is asked for a bare JSON object but often wraps it in a Markdown
//! fence or a sentence of prose, so the outermost `{ ... }` is extracted first.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ParseError;

use super::model::{Edit, Suggestion, SuggestionKind};

/// A validated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
    pub summary: Option<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    suggestions: Vec<RawSuggestion>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Deserialize)]
struct RawSuggestion {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "proposed_changes")]
    edits: Vec<RawEdit>,
}

#[derive(Deserialize)]
struct RawEdit {
    line: i64,
    column: i64,
    #[serde(default)]
    old_content: String,
    #[serde(default)]
    new_content: String,
}

/// Parse and validate a raw response. Every suggestion starts out pending, stamped `now`.
pub fn parse_suggestions_response(
    raw: &str,
    now: DateTime<Utc>,
) -> Result<SuggestionsResponse, ParseError> {
    let json = extract_json(raw).ok_or(ParseError::NoJson)?;
    let response: RawResponse =
        serde_json::from_str(json).map_err(|e| ParseError::Json(e.to_string()))?;

    let suggestions = response
        .suggestions
        .into_iter()
        .enumerate()
        .map(|(index, raw)| validate(index, raw, now))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SuggestionsResponse {
        suggestions,
        summary: response.summary.filter(|s| !s.trim().is_empty()),
    })
}

fn validate(index: usize, raw: RawSuggestion, now: DateTime<Utc>) -> Result<Suggestion, ParseError> {
    let kind: SuggestionKind = raw
        .kind
        .trim()
        .to_lowercase()
        .parse()
        .map_err(|kind| ParseError::UnknownKind { index, kind })?;

    let title = raw.title.trim();
    if title.is_empty() {
        return Err(ParseError::Invalid {
            index,
            reason: "missing title".to_string(),
        });
    }

    let edits = raw
        .edits
        .into_iter()
        .enumerate()
        .map(|(edit_index, edit)| {
            let line = positive(edit.line);
            let column = positive(edit.column);
            match (line, column) {
                (Some(line), Some(column)) => Ok(Edit {
                    line,
                    column,
                    old_content: edit.old_content,
                    new_content: edit.new_content,
                }),
                _ => Err(ParseError::Invalid {
                    index,
                    reason: format!(
                        "edit {edit_index} has line {} column {}; both must be at least 1",
                        edit.line, edit.column
                    ),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Suggestion::new(kind, title, raw.description.trim(), edits, now))
}

fn positive(value: i64) -> Option<usize> {
    usize::try_from(value).ok().filter(|v| *v >= 1)
}

/// The outermost JSON object in `raw`, ignoring fences and surrounding prose.
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::SuggestionStatus;
    use pretty_assertions::assert_eq;

    const RESPONSE: &str = r#"{
        "suggestions": [
            {
                "type": "clarity",
                "title": "Name the audience",
                "description": "Say who the explanation is for.",
                "edits": [
                    {"line": 1, "column": 1, "old_content": "Explain", "new_content": "Explain to a beginner"}
                ]
            },
            {
                "type": "gap",
                "title": "Add an output format",
                "description": "",
                "edits": []
            }
        ],
        "summary": "Two small improvements."
    }"#;

    #[test]
    fn test_parse_valid_response() {
        let parsed = parse_suggestions_response(RESPONSE, Utc::now()).unwrap();
        assert_eq!(parsed.suggestions.len(), 2);
        let first = &parsed.suggestions[0];
        assert_eq!(first.kind, SuggestionKind::Clarity);
        assert_eq!(first.status, SuggestionStatus::Pending);
        assert_eq!(first.edits, vec![Edit::new(1, 1, "Explain", "Explain to a beginner")]);
        assert_eq!(parsed.summary.as_deref(), Some("Two small improvements."));
        assert_ne!(first.id, parsed.suggestions[1].id);
    }

    #[test]
    fn test_fenced_response() {
        let raw = format!("Here you go:\n```json\n{RESPONSE}\n```\n");
        let parsed = parse_suggestions_response(&raw, Utc::now()).unwrap();
        assert_eq!(parsed.suggestions.len(), 2);
    }

    #[test]
    fn test_proposed_changes_alias() {
        let raw = r#"{"suggestions":[{"type":"formatting","title":"Use a list",
            "proposed_changes":[{"line":2,"column":3,"old_content":"a","new_content":"b","length":1}]}]}"#;
        let parsed = parse_suggestions_response(raw, Utc::now()).unwrap();
        assert_eq!(parsed.suggestions[0].edits, vec![Edit::new(2, 3, "a", "b")]);
        assert_eq!(parsed.summary, None);
    }

    #[test]
    fn test_empty_suggestion_list_is_valid() {
        let parsed =
            parse_suggestions_response(r#"{"suggestions": [], "summary": "Looks good."}"#, Utc::now())
                .unwrap();
        assert!(parsed.suggestions.is_empty());
    }

    #[test]
    fn test_kind_is_case_insensitive() {
        let raw = r#"{"suggestions":[{"type":"Contradiction","title":"t"}]}"#;
        let parsed = parse_suggestions_response(raw, Utc::now()).unwrap();
        assert_eq!(parsed.suggestions[0].kind, SuggestionKind::Contradiction);
    }

    #[test]
    fn test_unknown_kind() {
        let raw = r#"{"suggestions":[{"type":"clarity","title":"a"},{"type":"praise","title":"b"}]}"#;
        assert_eq!(
            parse_suggestions_response(raw, Utc::now()),
            Err(ParseError::UnknownKind {
                index: 1,
                kind: "praise".into()
            })
        );
    }

    #[test]
    fn test_missing_title() {
        let raw = r#"{"suggestions":[{"type":"gap","title":"  "}]}"#;
        assert!(matches!(
            parse_suggestions_response(raw, Utc::now()),
            Err(ParseError::Invalid { index: 0, .. })
        ));
    }

    #[test]
    fn test_non_positive_coordinates() {
        let raw = r#"{"suggestions":[{"type":"gap","title":"t",
            "edits":[{"line":0,"column":1,"old_content":"","new_content":"x"}]}]}"#;
        assert!(matches!(
            parse_suggestions_response(raw, Utc::now()),
            Err(ParseError::Invalid { index: 0, .. })
        ));
        let raw = r#"{"suggestions":[{"type":"gap","title":"t",
            "edits":[{"line":1,"column":-4}]}]}"#;
        assert!(parse_suggestions_response(raw, Utc::now()).is_err());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert_eq!(
            parse_suggestions_response("I cannot help with that.", Utc::now()),
            Err(ParseError::NoJson)
        );
        assert!(matches!(
            parse_suggestions_response("{not json}", Utc::now()),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            parse_suggestions_response(r#"{"summary": "no list"}"#, Utc::now()),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            parse_suggestions_response(r#"{"suggestions": [{"title": "untyped"}]}"#, Utc::now()),
            Err(ParseError::Json(_))
        ));
    }
}
