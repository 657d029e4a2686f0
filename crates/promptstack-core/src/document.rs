//! The document boundary: the live text the assist engine reads and mutates.

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// 1-indexed cursor position; the column counts characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorPos {
    pub line: usize,
    pub column: usize,
}

impl CursorPos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for CursorPos {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// The editor collaborator.
///
/// `apply_mutation` is the engine's own write path and ignores the read-only
/// flag; the flag guards user input, see [`Buffer::insert_text`].
pub trait DocumentProvider: Send {
    fn text(&self) -> String;
    fn apply_mutation(&mut self, new_text: String);
    fn set_read_only(&mut self, read_only: bool);
    fn is_read_only(&self) -> bool;
    fn cursor(&self) -> CursorPos;
    fn set_cursor(&mut self, pos: CursorPos);
}

/// In-memory document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    text: String,
    read_only: bool,
    cursor: CursorPos,
}

impl Buffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            read_only: false,
            cursor: CursorPos::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// User typing at the cursor. Rejected while read-only.
    pub fn insert_text(&mut self, s: &str) -> Result<(), DocumentError> {
        if self.read_only {
            return Err(DocumentError::ReadOnly);
        }
        let offset = self.cursor_offset();
        let byte = byte_index(&self.text, offset);
        self.text.insert_str(byte, s);
        self.cursor = position_of(&self.text, offset + s.chars().count());
        Ok(())
    }

    /// User replacing the whole text (paste over, external reload). Rejected while read-only.
    pub fn replace_text(&mut self, text: impl Into<String>) -> Result<(), DocumentError> {
        if self.read_only {
            return Err(DocumentError::ReadOnly);
        }
        self.text = text.into();
        self.cursor = self.clamp(self.cursor);
        Ok(())
    }

    /// Cursor navigation is always allowed.
    pub fn move_cursor(&mut self, pos: CursorPos) {
        self.cursor = self.clamp(pos);
    }

    fn cursor_offset(&self) -> usize {
        let mut offset = 0;
        for (i, line) in self.text.split('\n').enumerate() {
            let len = line.chars().count();
            if i + 1 == self.cursor.line {
                return offset + (self.cursor.column - 1).min(len);
            }
            offset += len + 1;
        }
        self.text.chars().count()
    }

    fn clamp(&self, pos: CursorPos) -> CursorPos {
        let lines: Vec<&str> = self.text.split('\n').collect();
        let line = pos.line.clamp(1, lines.len());
        let max_column = lines[line - 1].chars().count() + 1;
        CursorPos::new(line, pos.column.clamp(1, max_column))
    }
}

impl DocumentProvider for Buffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn apply_mutation(&mut self, new_text: String) {
        self.text = new_text;
        self.cursor = self.clamp(self.cursor);
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn cursor(&self) -> CursorPos {
        self.cursor
    }

    fn set_cursor(&mut self, pos: CursorPos) {
        self.move_cursor(pos);
    }
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(byte, _)| byte)
}

/// Cursor position of a character offset.
pub(crate) fn position_of(text: &str, char_offset: usize) -> CursorPos {
    let mut line = 1;
    let mut column = 1;
    for c in text.chars().take(char_offset) {
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    CursorPos::new(line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_at_cursor() {
        let mut buffer = Buffer::new("ac\nxy");
        buffer.move_cursor(CursorPos::new(1, 2));
        buffer.insert_text("b").unwrap();
        assert_eq!(buffer.as_str(), "abc\nxy");
        assert_eq!(buffer.cursor(), CursorPos::new(1, 3));

        buffer.insert_text("\n").unwrap();
        assert_eq!(buffer.as_str(), "ab\nc\nxy");
        assert_eq!(buffer.cursor(), CursorPos::new(2, 1));
    }

    #[test]
    fn test_insert_multibyte() {
        let mut buffer = Buffer::new("héllo");
        buffer.move_cursor(CursorPos::new(1, 3));
        buffer.insert_text("é").unwrap();
        assert_eq!(buffer.as_str(), "hééllo");
    }

    #[test]
    fn test_read_only_rejects_input_but_not_navigation() {
        let mut buffer = Buffer::new("text\nmore");
        buffer.set_read_only(true);
        assert_eq!(buffer.insert_text("x"), Err(DocumentError::ReadOnly));
        assert_eq!(buffer.replace_text("y"), Err(DocumentError::ReadOnly));
        assert_eq!(buffer.as_str(), "text\nmore");

        buffer.set_cursor(CursorPos::new(2, 3));
        assert_eq!(buffer.cursor(), CursorPos::new(2, 3));

        buffer.apply_mutation("engine write".to_string());
        assert_eq!(buffer.text(), "engine write");
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut buffer = Buffer::new("ab\ncdef");
        buffer.move_cursor(CursorPos::new(9, 9));
        assert_eq!(buffer.cursor(), CursorPos::new(2, 5));
        buffer.move_cursor(CursorPos::new(0, 0));
        assert_eq!(buffer.cursor(), CursorPos::new(1, 1));

        buffer.move_cursor(CursorPos::new(2, 5));
        buffer.apply_mutation("x".to_string());
        assert_eq!(buffer.cursor(), CursorPos::new(1, 2));
    }

    #[test]
    fn test_position_of() {
        assert_eq!(position_of("ab\ncd", 0), CursorPos::new(1, 1));
        assert_eq!(position_of("ab\ncd", 2), CursorPos::new(1, 3));
        assert_eq!(position_of("ab\ncd", 3), CursorPos::new(2, 1));
        assert_eq!(position_of("ab\ncd", 5), CursorPos::new(2, 3));
    }
}
