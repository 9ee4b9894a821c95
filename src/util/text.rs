use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` to at most `max_cells` cells, ending in `…` when shortened.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }

    let budget = max_cells - 1;
    let mut width = 0;
    let mut out = String::new();
    for g in s.graphemes(true) {
        let w = display_width(g);
        if width + w > budget {
            break;
        }
        width += w;
        out.push_str(g);
    }
    out.push('\u{2026}');
    out
}

/// Single-line text being edited, with a cursor on a grapheme boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    text: String,
    /// Byte offset of the cursor
    cursor: usize,
}

impl EditBuffer {
    /// A buffer holding `text` with the cursor at the end
    pub fn new(text: &str) -> Self {
        EditBuffer {
            text: text.to_string(),
            cursor: text.len(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor position in terminal cells from the start
    pub fn cursor_col(&self) -> usize {
        display_width(&self.text[..self.cursor])
    }

    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(start) = self.prev_boundary() {
            self.text.replace_range(start..self.cursor, "");
            self.cursor = start;
        }
    }

    pub fn delete(&mut self) {
        if let Some(end) = self.next_boundary() {
            self.text.replace_range(self.cursor..end, "");
        }
    }

    pub fn left(&mut self) {
        if let Some(start) = self.prev_boundary() {
            self.cursor = start;
        }
    }

    pub fn right(&mut self) {
        if let Some(end) = self.next_boundary() {
            self.cursor = end;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Delete from the start of the previous word to the cursor.
    pub fn delete_word_back(&mut self) {
        let before = &self.text[..self.cursor];
        let trimmed = before.trim_end();
        let start = trimmed
            .unicode_word_indices()
            .last()
            .map_or(0, |(i, _)| i);
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .grapheme_indices(true)
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.text[self.cursor..]
            .graphemes(true)
            .next()
            .map(|g| self.cursor + g.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_counts_wide_chars() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("日本"), 4);
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
        assert_eq!(truncate_to_width("日本語", 4), "日…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn editing_moves_by_grapheme() {
        let mut buf = EditBuffer::new("cafe\u{301}");
        buf.backspace();
        assert_eq!(buf.text(), "caf");
        buf.left();
        buf.insert('X');
        assert_eq!(buf.text(), "caXf");
        buf.home();
        buf.delete();
        assert_eq!(buf.text(), "aXf");
        buf.end();
        buf.right();
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn cursor_column_uses_cell_width() {
        let buf = EditBuffer::new("日本");
        assert_eq!(buf.cursor_col(), 4);
    }

    #[test]
    fn delete_word_back() {
        let mut buf = EditBuffer::new("buy oat milk  ");
        buf.delete_word_back();
        assert_eq!(buf.text(), "buy oat ");
        buf.delete_word_back();
        buf.delete_word_back();
        assert_eq!(buf.text(), "");
        buf.delete_word_back();
        assert_eq!(buf.cursor(), 0);
    }
}
