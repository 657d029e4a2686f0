//! Edit application with all-or-nothing semantics.
//!
//! Positions are resolved against the original text, edits are put into
//! document order, and each one is spliced into a working copy after shifting
//! its offset by the net length change of the edits before it. Every
//! `old_content` is checked against the working copy before its splice; the
//! first mismatch aborts the whole batch and the caller's text is untouched.
//!
//! All offsets and lengths are in characters (Unicode scalar values).

use crate::error::EditError;

use super::model::Edit;

/// Start offsets of every line of a text, in characters.
#[derive(Debug, Clone)]
pub(crate) struct LineIndex {
    starts: Vec<usize>,
    total: usize,
}

impl LineIndex {
    pub(crate) fn new(chars: &[char]) -> Self {
        let mut starts = vec![0];
        starts.extend(
            chars
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            starts,
            total: chars.len(),
        }
    }

    /// Offset of the 1-indexed `(line, column)`. The column may sit one past the
    /// last character of the line.
    pub(crate) fn offset(&self, line: usize, column: usize) -> Option<usize> {
        let idx = line.checked_sub(1)?;
        let start = *self.starts.get(idx)?;
        let end = self.line_end(idx);
        let offset = start.checked_add(column.checked_sub(1)?)?;
        (offset <= end).then_some(offset)
    }

    /// 0-indexed line containing `offset`. A line's trailing `\n` belongs to it.
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|start| *start <= offset) - 1
    }

    /// Offset of the line's `\n`, or the text length for the last line.
    fn line_end(&self, idx: usize) -> usize {
        match self.starts.get(idx + 1) {
            Some(next) => next - 1,
            None => self.total,
        }
    }
}

/// Where one edit landed, in characters of the old and the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AppliedSpan {
    pub old_start: usize,
    pub old_end: usize,
    pub new_start: usize,
    pub new_end: usize,
}

/// Result of a successful apply, with the spans in document order.
#[derive(Debug, Clone)]
pub(crate) struct AppliedEdits {
    pub text: String,
    pub spans: Vec<AppliedSpan>,
}

struct ResolvedEdit {
    index: usize,
    offset: usize,
    insertion: bool,
    old: Vec<char>,
    new: Vec<char>,
}

/// Apply `edits` to `original`, returning the new text.
///
/// Input order does not matter: coordinates always refer to `original`.
pub fn apply_edits(original: &str, edits: &[Edit]) -> Result<String, EditError> {
    apply_with_spans(original, edits).map(|applied| applied.text)
}

/// Check that `edits` would apply cleanly to `original`.
pub fn validate_edits(original: &str, edits: &[Edit]) -> Result<(), EditError> {
    apply_with_spans(original, edits).map(|_| ())
}

pub(crate) fn apply_with_spans(original: &str, edits: &[Edit]) -> Result<AppliedEdits, EditError> {
    let chars: Vec<char> = original.chars().collect();
    let resolved = resolve(&chars, edits)?;

    let mut buffer = chars;
    let mut spans = Vec::with_capacity(resolved.len());
    let mut applied_offset: isize = 0;

    for edit in resolved {
        let start = shift(edit.offset, applied_offset);
        let end = start + edit.old.len();
        let actual = &buffer[start.min(buffer.len())..end.min(buffer.len())];
        if actual != edit.old.as_slice() {
            return Err(EditError::Conflict {
                edit_index: edit.index,
                expected: edit.old.iter().collect(),
                actual: actual.iter().collect(),
            });
        }

        let new_len = edit.new.len();
        buffer.splice(start..end, edit.new);
        spans.push(AppliedSpan {
            old_start: edit.offset,
            old_end: edit.offset + edit.old.len(),
            new_start: start,
            new_end: start + new_len,
        });
        applied_offset += new_len as isize - edit.old.len() as isize;
    }

    Ok(AppliedEdits {
        text: buffer.into_iter().collect(),
        spans,
    })
}

/// Resolve coordinates, sort into document order and reject overlaps.
fn resolve(chars: &[char], edits: &[Edit]) -> Result<Vec<ResolvedEdit>, EditError> {
    let index = LineIndex::new(chars);
    let mut resolved = Vec::with_capacity(edits.len());

    for (i, edit) in edits.iter().enumerate() {
        if edit.line == 0 || edit.column == 0 {
            return Err(EditError::Validation {
                edit_index: i,
                reason: format!(
                    "line and column are 1-indexed, got line {} column {}",
                    edit.line, edit.column
                ),
            });
        }
        let offset = index
            .offset(edit.line, edit.column)
            .ok_or(EditError::OutOfRange {
                edit_index: i,
                line: edit.line,
                column: edit.column,
            })?;
        resolved.push(ResolvedEdit {
            index: i,
            offset,
            insertion: edit.is_insertion(),
            old: edit.old_content.chars().collect(),
            new: edit.new_content.chars().collect(),
        });
    }

    // Insertions go before a replacement at the same offset; otherwise input order.
    resolved.sort_by_key(|e| (e.offset, !e.insertion, e.index));

    for pair in resolved.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.offset < prev.offset + prev.old.len() {
            return Err(EditError::Order {
                first: prev.index.min(next.index),
                second: prev.index.max(next.index),
            });
        }
    }

    Ok(resolved)
}

fn shift(offset: usize, delta: isize) -> usize {
    offset.saturating_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_replacement() {
        let edits = [Edit::new(1, 1, "Hello", "Hi")];
        assert_eq!(apply_edits("Hello world", &edits).unwrap(), "Hi world");
    }

    #[test]
    fn test_mismatch_is_conflict() {
        let edits = [Edit::new(1, 1, "Goodbye", "Hi")];
        let err = apply_edits("Hello world", &edits).unwrap_err();
        assert_eq!(
            err,
            EditError::Conflict {
                edit_index: 0,
                expected: "Goodbye".into(),
                actual: "Hello w".into(),
            }
        );
    }

    #[test]
    fn test_same_line_edits_in_either_order() {
        let text = "The quick brown fox";
        let shorten = Edit::new(1, 5, "quick", "qk");
        let recolor = Edit::new(1, 11, "brown", "red");
        assert_eq!(
            apply_edits(text, &[shorten.clone(), recolor.clone()]).unwrap(),
            "The qk red fox"
        );
        assert_eq!(apply_edits(text, &[recolor, shorten]).unwrap(), "The qk red fox");
    }

    #[test]
    fn test_multiline_and_growth() {
        let text = "line one\nline two\nline three";
        let edits = [
            Edit::new(3, 6, "three", "3"),
            Edit::new(1, 6, "one", "one\ninserted"),
            Edit::new(2, 1, "line two\n", ""),
        ];
        assert_eq!(
            apply_edits(text, &edits).unwrap(),
            "line one\ninserted\nline 3"
        );
    }

    #[test]
    fn test_columns_count_characters() {
        let text = "héllo wörld";
        let edits = [Edit::new(1, 7, "wörld", "world")];
        assert_eq!(apply_edits(text, &edits).unwrap(), "héllo world");
    }

    #[test]
    fn test_insertion_at_end_of_line_and_text() {
        let text = "ab\ncd";
        let edits = [Edit::new(1, 3, "", "!"), Edit::new(2, 3, "", "?")];
        assert_eq!(apply_edits(text, &edits).unwrap(), "ab!\ncd?");
    }

    #[test]
    fn test_insertion_before_replacement_at_same_offset() {
        let edits = [Edit::new(1, 1, "abc", "xyz"), Edit::new(1, 1, "", ">")];
        assert_eq!(apply_edits("abc", &edits).unwrap(), ">xyz");

        let edits = [
            Edit::new(1, 1, "", "1"),
            Edit::new(1, 1, "abc", "z"),
            Edit::new(1, 1, "", "2"),
        ];
        assert_eq!(apply_edits("abc", &edits).unwrap(), "12z");
    }

    #[test]
    fn test_zero_coordinates_rejected() {
        let err = apply_edits("abc", &[Edit::new(0, 1, "a", "b")]).unwrap_err();
        assert!(matches!(err, EditError::Validation { edit_index: 0, .. }));
        let err = apply_edits("abc", &[Edit::new(1, 1, "", ""), Edit::new(1, 0, "a", "b")])
            .unwrap_err();
        assert!(matches!(err, EditError::Validation { edit_index: 1, .. }));
    }

    #[test]
    fn test_out_of_range() {
        let err = apply_edits("abc\ndef", &[Edit::new(3, 1, "", "x")]).unwrap_err();
        assert_eq!(
            err,
            EditError::OutOfRange {
                edit_index: 0,
                line: 3,
                column: 1
            }
        );
        let err = apply_edits("abc\ndef", &[Edit::new(1, 5, "", "x")]).unwrap_err();
        assert!(matches!(err, EditError::OutOfRange { .. }));
    }

    #[test]
    fn test_old_content_past_end_is_conflict() {
        let err = apply_edits("abc", &[Edit::new(1, 2, "bcd", "x")]).unwrap_err();
        assert_eq!(
            err,
            EditError::Conflict {
                edit_index: 0,
                expected: "bcd".into(),
                actual: "bc".into(),
            }
        );
    }

    #[test]
    fn test_overlap_is_order_error() {
        let edits = [Edit::new(1, 3, "cde", "X"), Edit::new(1, 1, "abc", "Y")];
        assert_eq!(
            apply_edits("abcdef", &edits).unwrap_err(),
            EditError::Order {
                first: 0,
                second: 1
            }
        );
    }

    #[test]
    fn test_conflict_reports_caller_index() {
        let edits = [
            Edit::new(2, 1, "zzz", "y"),
            Edit::new(1, 1, "abc", "x"),
        ];
        let err = apply_edits("abc\ndef", &edits).unwrap_err();
        assert!(matches!(err, EditError::Conflict { edit_index: 0, .. }));
    }

    #[test]
    fn test_empty_edit_list_is_identity() {
        assert_eq!(apply_edits("unchanged", &[]).unwrap(), "unchanged");
        assert_eq!(apply_edits("", &[]).unwrap(), "");
    }

    #[test]
    fn test_insert_into_empty_document() {
        assert_eq!(
            apply_edits("", &[Edit::new(1, 1, "", "# Title")]).unwrap(),
            "# Title"
        );
    }

    #[test]
    fn test_spans_track_both_texts() {
        let applied = apply_with_spans(
            "aaa bbb ccc",
            &[Edit::new(1, 9, "ccc", "C"), Edit::new(1, 1, "aaa", "AAAAA")],
        )
        .unwrap();
        assert_eq!(applied.text, "AAAAA bbb C");
        assert_eq!(
            applied.spans,
            vec![
                AppliedSpan {
                    old_start: 0,
                    old_end: 3,
                    new_start: 0,
                    new_end: 5
                },
                AppliedSpan {
                    old_start: 8,
                    old_end: 11,
                    new_start: 10,
                    new_end: 11
                },
            ]
        );
    }

    #[test]
    fn test_line_index() {
        let chars: Vec<char> = "ab\n\ncd".chars().collect();
        let index = LineIndex::new(&chars);
        assert_eq!(index.starts.len(), 3);
        assert_eq!(index.offset(1, 3), Some(2));
        assert_eq!(index.offset(2, 1), Some(3));
        assert_eq!(index.offset(2, 2), None);
        assert_eq!(index.offset(3, 3), Some(6));
        assert_eq!(index.line_of(2), 0);
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_of(6), 2);
    }
}
