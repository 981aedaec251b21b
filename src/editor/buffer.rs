use ropey::Rope;
use unicode_width::UnicodeWidthStr;

/// Undo steps kept before the oldest is dropped.
const HISTORY_LIMIT: usize = 200;

/// Cursor position in the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column (byte offset within the line).
    pub col: usize,
    /// Column to return to when moving vertically through shorter lines.
    col_memory: usize,
}

impl Cursor {
    pub const fn new() -> Self {
        Self::at(0, 0)
    }

    pub const fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            col_memory: col,
        }
    }

    const fn set_col(&mut self, col: usize) {
        self.col = col;
        self.col_memory = col;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Text and cursor as they were before an edit.
#[derive(Clone)]
struct Snapshot {
    rope: Rope,
    cursor: Cursor,
}

/// The editor's document text.
///
/// Every mutation bumps a revision counter. The buffer is dirty whenever the
/// current revision differs from the last one that was loaded or saved, so a
/// save that finishes after further typing leaves the buffer dirty.
///
/// Edits are recorded as rope snapshots for undo. A run of typed characters
/// counts as one step. Undo and redo are edits too: they bump the revision
/// rather than restoring an old one.
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    revision: u64,
    clean_revision: u64,
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    /// Where the last typed character ended, while a typing run is open.
    typing_at: Option<(usize, usize)>,
}

impl EditorBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::new(),
            revision: 0,
            clean_revision: 0,
            undo: Vec::new(),
            redo: Vec::new(),
            typing_at: None,
        }
    }

    pub fn empty() -> Self {
        Self::from_text("")
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Counter bumped by every change to the text.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the text changed since it was loaded or last saved.
    pub const fn is_dirty(&self) -> bool {
        self.revision != self.clean_revision
    }

    /// Record a successful save of the text as it was at `revision`.
    ///
    /// Returns `false`, leaving the buffer dirty, when the text changed after
    /// the save was requested.
    pub fn mark_saved(&mut self, revision: u64) -> bool {
        if revision != self.revision {
            return false;
        }
        self.clean_revision = revision;
        true
    }

    /// Replace the whole text with freshly loaded content.
    ///
    /// The cursor returns to the start and the buffer counts as clean.
    /// Undo history does not reach back past a load.
    pub fn load_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.cursor = Cursor::new();
        self.undo.clear();
        self.redo.clear();
        self.typing_at = None;
        self.bump();
        self.clean_revision = self.revision;
    }

    /// Replace the whole text as an edit.
    ///
    /// The cursor stays where it was, clamped to the new text.
    pub fn replace_text(&mut self, text: &str) {
        self.checkpoint();
        let Cursor { line, col, .. } = self.cursor;
        self.rope = Rope::from_str(text);
        self.bump();
        self.move_to(line, col);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Step back to the text before the last edit.
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo.push(current);
        self.restore(previous);
        true
    }

    /// Re-apply the last undone edit.
    ///
    /// Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo.push(current);
        self.restore(next);
        true
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Content of a line without its line terminator.
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx).to_string();
        Some(line.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    /// Length of a line in bytes, without its line terminator.
    pub fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.len())
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Terminal column of the cursor on its line.
    pub fn cursor_display_col(&self) -> usize {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let col = self.cursor.col.min(line.len());
        line.get(..col).map_or(0, UnicodeWidthStr::width)
    }

    pub fn insert_char(&mut self, ch: char) {
        if self.typing_at != Some((self.cursor.line, self.cursor.col)) {
            self.checkpoint();
        }
        let char_idx = self.cursor_char_idx();
        self.rope.insert_char(char_idx, ch);
        self.cursor.set_col(self.cursor.col + ch.len_utf8());
        self.typing_at = Some((self.cursor.line, self.cursor.col));
        self.bump();
    }

    /// Insert `s` at the cursor and move the cursor past it.
    pub fn insert_str(&mut self, s: &str) {
        let s = s.replace("\r\n", "\n");
        if s.is_empty() {
            return;
        }
        self.checkpoint();
        let char_idx = self.cursor_char_idx();
        self.rope.insert(char_idx, &s);

        match s.rsplit_once('\n') {
            Some((head, tail)) => {
                self.cursor.line += head.matches('\n').count() + 1;
                self.cursor.set_col(tail.len());
            }
            None => self.cursor.set_col(self.cursor.col + s.len()),
        }
        self.bump();
    }

    /// Break the line at the cursor (Enter).
    pub fn split_line(&mut self) {
        self.checkpoint();
        let char_idx = self.cursor_char_idx();
        self.rope.insert_char(char_idx, '\n');
        self.cursor.line += 1;
        self.cursor.set_col(0);
        self.bump();
    }

    /// Delete the character before the cursor (Backspace).
    ///
    /// Returns `true` if a character was deleted.
    pub fn delete_back(&mut self) -> bool {
        if self.cursor.col == 0 && self.cursor.line == 0 {
            return false;
        }
        self.checkpoint();
        let char_idx = self.cursor_char_idx();
        if self.cursor.col == 0 {
            let prev_len = self.line_len(self.cursor.line - 1);
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.line -= 1;
            self.cursor.set_col(prev_len);
        } else {
            let prev_len = self.prev_char_len();
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.set_col(self.cursor.col - prev_len);
        }
        self.bump();
        true
    }

    /// Delete the character under the cursor (Delete).
    ///
    /// Returns `true` if a character was deleted.
    pub fn delete_forward(&mut self) -> bool {
        let at_line_end = self.cursor.col >= self.line_len(self.cursor.line);
        if at_line_end && self.cursor.line + 1 >= self.line_count() {
            return false;
        }
        self.checkpoint();
        let char_idx = self.cursor_char_idx();
        self.rope.remove(char_idx..=char_idx);
        self.bump();
        true
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
            Direction::Up => self.move_vertically(-1),
            Direction::Down => self.move_vertically(1),
        }
    }

    /// Move up by `lines`, stopping at the first line (Page Up).
    pub fn page_up(&mut self, lines: usize) {
        self.move_vertically(-isize::try_from(lines).unwrap_or(isize::MAX));
    }

    /// Move down by `lines`, stopping at the last line (Page Down).
    pub fn page_down(&mut self, lines: usize) {
        self.move_vertically(isize::try_from(lines).unwrap_or(isize::MAX));
    }

    pub const fn move_home(&mut self) {
        self.cursor.set_col(0);
    }

    pub fn move_end(&mut self) {
        let len = self.line_len(self.cursor.line);
        self.cursor.set_col(len);
    }

    /// Move to the start of the previous word (Ctrl+Left).
    pub fn move_word_left(&mut self) {
        if self.cursor.col == 0 {
            if self.cursor.line > 0 {
                self.cursor.line -= 1;
                self.cursor.set_col(self.line_len(self.cursor.line));
            }
            return;
        }
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let before = line[..self.cursor.col].trim_end();
        let pos = before
            .rfind(|c: char| !is_word_char(c))
            .map_or(0, |i| i + before[i..].chars().next().map_or(1, char::len_utf8));
        self.cursor.set_col(pos);
    }

    /// Move past the current word and the gap after it (Ctrl+Right).
    pub fn move_word_right(&mut self) {
        if self.cursor.col >= self.line_len(self.cursor.line) {
            if self.cursor.line + 1 < self.line_count() {
                self.cursor.line += 1;
                self.cursor.set_col(0);
            }
            return;
        }
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let after = &line[self.cursor.col..];
        let word_end = after.find(|c: char| !is_word_char(c)).unwrap_or(after.len());
        let rest = &after[word_end..];
        let gap_end = rest.find(is_word_char).unwrap_or(rest.len());
        self.cursor.set_col(self.cursor.col + word_end + gap_end);
    }

    /// Move to `line`/`col`, clamped to the text.
    pub fn move_to(&mut self, line: usize, col: usize) {
        self.cursor.line = line.min(self.line_count().saturating_sub(1));
        let text = self.line_at(self.cursor.line).unwrap_or_default();
        let mut col = col.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.set_col(col);
    }

    pub const fn move_to_start(&mut self) {
        self.cursor.line = 0;
        self.cursor.set_col(0);
    }

    pub fn move_to_end(&mut self) {
        let last = self.line_count().saturating_sub(1);
        self.cursor.line = last;
        self.cursor.set_col(self.line_len(last));
    }

    const fn bump(&mut self) {
        self.revision += 1;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            rope: self.rope.clone(),
            cursor: self.cursor,
        }
    }

    /// Record the text before an edit and close any typing run.
    fn checkpoint(&mut self) {
        if self.undo.len() == HISTORY_LIMIT {
            self.undo.remove(0);
        }
        let snapshot = self.snapshot();
        self.undo.push(snapshot);
        self.redo.clear();
        self.typing_at = None;
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.rope = snapshot.rope;
        self.typing_at = None;
        self.bump();
        self.move_to(snapshot.cursor.line, snapshot.cursor.col);
    }

    /// Replace the content of `line_idx` as one edit, leaving the cursor on
    /// that line at `col`.
    pub(super) fn replace_line(&mut self, line_idx: usize, content: &str, col: usize) {
        let Some(old) = self.line_at(line_idx) else {
            return;
        };
        if old == content {
            return;
        }
        self.checkpoint();
        let start = self.rope.line_to_char(line_idx);
        self.rope.remove(start..start + old.chars().count());
        self.rope.insert(start, content);
        self.bump();
        self.move_to(line_idx, col);
    }

    fn cursor_char_idx(&self) -> usize {
        let line_start = self.rope.line_to_char(self.cursor.line);
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let byte_col = self.cursor.col.min(line.len());
        line_start + line[..byte_col].chars().count()
    }

    fn prev_char_len(&self) -> usize {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        line[..self.cursor.col]
            .chars()
            .next_back()
            .map_or(1, char::len_utf8)
    }

    fn move_left(&mut self) {
        if self.cursor.col > 0 {
            let prev_len = self.prev_char_len();
            self.cursor.set_col(self.cursor.col - prev_len);
        } else if self.cursor.line > 0 {
            self.cursor.line -= 1;
            self.cursor.set_col(self.line_len(self.cursor.line));
        }
    }

    fn move_right(&mut self) {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        if self.cursor.col < line.len() {
            let next_len = line[self.cursor.col..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            self.cursor.set_col(self.cursor.col + next_len);
        } else if self.cursor.line + 1 < self.line_count() {
            self.cursor.line += 1;
            self.cursor.set_col(0);
        }
    }

    fn move_vertically(&mut self, delta: isize) {
        let last = self.line_count().saturating_sub(1);
        let target = self.cursor.line.saturating_add_signed(delta).min(last);
        if target == self.cursor.line {
            return;
        }
        self.cursor.line = target;
        let text = self.line_at(target).unwrap_or_default();
        let mut col = self.cursor.col_memory.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.col = col;
    }
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field("rope", &format_args!("Rope({} lines)", self.rope.len_lines()))
            .field("cursor", &self.cursor)
            .field("revision", &self.revision)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
