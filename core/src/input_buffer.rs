//! Raw input buffer with cursor tracking.
//!
//! The buffer stores the raw keystrokes (e.g. "neihou") and a cursor position.
//! In ASCII-only mode every character is one byte, so byte offsets, character
//! offsets and segment-graph node ids coincide.

/// Input buffer tracking raw input and cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize, // Byte offset
    ascii_only: bool,
}

impl InputBuffer {
    /// Create a new empty input buffer.
    pub fn new(ascii_only: bool) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            ascii_only,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get the cursor position (byte offset).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_ascii_only(&self) -> bool {
        self.ascii_only
    }

    /// Clear the buffer and reset cursor.
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Insert `s` at the cursor and move the cursor past it.
    ///
    /// Returns false, leaving the buffer untouched, when `s` is empty or when
    /// the buffer is ASCII-only and `s` is not.
    pub fn type_str(&mut self, s: &str) -> bool {
        if s.is_empty() || (self.ascii_only && !s.is_ascii()) {
            return false;
        }
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
        true
    }

    /// Remove `text[from..to]`. The range is clamped to the buffer.
    ///
    /// A cursor inside or after the erased range moves back with the text.
    pub fn erase(&mut self, from: usize, to: usize) {
        let to = to.min(self.text.len());
        if from >= to || !self.text.is_char_boundary(from) || !self.text.is_char_boundary(to) {
            return;
        }
        self.text.replace_range(from..to, "");
        if self.cursor > to {
            self.cursor -= to - from;
        } else if self.cursor > from {
            self.cursor = from;
        }
    }

    /// Delete the character before the cursor (backspace).
    /// Returns true if a character was deleted.
    pub fn backspace(&mut self) -> bool {
        let Some(prev) = self.text[..self.cursor].char_indices().last().map(|(i, _)| i) else {
            return false;
        };
        self.erase(prev, self.cursor);
        true
    }

    /// Set the cursor position (must be at a character boundary).
    pub fn set_cursor(&mut self, pos: usize) -> bool {
        if pos <= self.text.len() && self.text.is_char_boundary(pos) {
            self.cursor = pos;
            true
        } else {
            false
        }
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.text.len();
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_inserts_at_cursor() {
        let mut buf = InputBuffer::default();
        assert!(buf.type_str("hou"));
        assert!(buf.set_cursor(0));
        assert!(buf.type_str("nei"));
        assert_eq!(buf.text(), "neihou");
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn ascii_only_rejects_hanzi() {
        let mut buf = InputBuffer::default();
        assert!(!buf.type_str("你"));
        assert!(buf.is_empty());
        let mut wide = InputBuffer::new(false);
        assert!(wide.type_str("你"));
        assert_eq!(wide.len(), 3);
    }

    #[test]
    fn erase_moves_cursor_back() {
        let mut buf = InputBuffer::default();
        buf.type_str("neihou");
        buf.erase(1, 3);
        assert_eq!(buf.text(), "nhou");
        assert_eq!(buf.cursor(), 4);
        buf.set_cursor(2);
        buf.erase(1, 10);
        assert_eq!(buf.text(), "n");
        assert_eq!(buf.cursor(), 1);
        assert!(buf.backspace());
        assert!(!buf.backspace());
    }
}
