//! Markdown formatting commands for the editor.
//!
//! The editor has no selection, so inline formatting applies to the word
//! under the cursor and list formatting to the cursor line. Each command is
//! a single undo step.

use super::buffer::EditorBuffer;

/// Inline emphasis the editor can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Bold,
    Italic,
    Underline,
}

impl Emphasis {
    /// Opening and closing markers.
    pub const fn markers(self) -> (&'static str, &'static str) {
        match self {
            Self::Bold => ("**", "**"),
            Self::Italic => ("_", "_"),
            Self::Underline => ("<u>", "</u>"),
        }
    }
}

/// List style for the cursor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Numbered,
}

/// Columns in an inserted table.
pub const TABLE_COLUMNS: usize = 3;
/// Body rows in an inserted table.
pub const TABLE_ROWS: usize = 2;

/// Byte range of the word touching `col`, if any.
fn word_bounds(line: &str, col: usize) -> Option<(usize, usize)> {
    let is_word = |c: char| c.is_alphanumeric();
    let start = line[..col]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_word(c))
        .last()
        .map_or(col, |(i, _)| i);
    let end = line[col..]
        .char_indices()
        .find(|&(_, c)| !is_word(c))
        .map_or(line.len(), |(i, _)| col + i);
    (start < end).then_some((start, end))
}

/// Length of a list marker at the start of `rest`, and its kind.
fn list_marker(rest: &str) -> Option<(usize, ListKind)> {
    if ["* ", "- ", "+ "].iter().any(|marker| rest.starts_with(marker)) {
        return Some((2, ListKind::Bullet));
    }
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    (digits > 0 && rest[digits..].starts_with(". ")).then_some((digits + 2, ListKind::Numbered))
}

/// A table with a header row, a delimiter row and `rows` empty body rows.
pub fn table_skeleton(columns: usize, rows: usize) -> String {
    let columns = columns.max(1);
    let header = (1..=columns)
        .map(|n| format!(" Column {n} "))
        .collect::<Vec<_>>()
        .join("|");
    let delimiter = vec![" --- "; columns].join("|");
    let empty = vec!["  "; columns].join("|");
    let mut lines = vec![format!("|{header}|"), format!("|{delimiter}|")];
    lines.extend(std::iter::repeat_n(format!("|{empty}|"), rows));
    lines.join("\n")
}

impl EditorBuffer {
    /// Wrap the word under the cursor in `emphasis`, or unwrap it when it is
    /// already wrapped.
    ///
    /// Away from any word, an empty pair is inserted with the cursor between
    /// the markers.
    pub fn toggle_emphasis(&mut self, emphasis: Emphasis) {
        let (open, close) = emphasis.markers();
        let cursor = self.cursor();
        let line = self.line_at(cursor.line).unwrap_or_default();
        let col = cursor.col.min(line.len());

        let Some((start, end)) = word_bounds(&line, col) else {
            self.insert_str(&format!("{open}{close}"));
            let after = self.cursor();
            self.move_to(after.line, after.col - close.len());
            return;
        };

        let wrapped = line[..start].ends_with(open) && line[end..].starts_with(close);
        let (content, col) = if wrapped {
            let content = format!(
                "{}{}{}",
                &line[..start - open.len()],
                &line[start..end],
                &line[end + close.len()..]
            );
            (content, col - open.len())
        } else {
            let content = format!(
                "{}{open}{}{close}{}",
                &line[..start],
                &line[start..end],
                &line[end..]
            );
            (content, col + open.len())
        };
        self.replace_line(cursor.line, &content, col);
    }

    /// Link the word under the cursor to `url`.
    ///
    /// Away from any word, the url itself becomes the link text. The cursor
    /// ends up after the link.
    pub fn insert_link(&mut self, url: &str) {
        let cursor = self.cursor();
        let line = self.line_at(cursor.line).unwrap_or_default();
        let col = cursor.col.min(line.len());
        match word_bounds(&line, col) {
            Some((start, end)) => {
                let link = format!("[{}]({url})", &line[start..end]);
                let content = format!("{}{link}{}", &line[..start], &line[end..]);
                self.replace_line(cursor.line, &content, start + link.len());
            }
            None => self.insert_str(&format!("[{url}]({url})")),
        }
    }

    /// Make the cursor line a `kind` list item, switch it from the other
    /// kind, or turn it back into plain text.
    ///
    /// A numbered item continues the numbering of a numbered line above it.
    pub fn toggle_list(&mut self, kind: ListKind) {
        let cursor = self.cursor();
        let line = self.line_at(cursor.line).unwrap_or_default();
        let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
        let rest = &line[indent..];

        let (old_len, new_marker) = match list_marker(rest) {
            Some((len, existing)) if existing == kind => (len, String::new()),
            Some((len, _)) => (len, self.list_marker_for(kind, cursor.line)),
            None => (0, self.list_marker_for(kind, cursor.line)),
        };
        let content = format!("{}{new_marker}{}", &line[..indent], &rest[old_len..]);
        let col = if cursor.col < indent {
            cursor.col
        } else {
            (cursor.col + new_marker.len())
                .saturating_sub(old_len)
                .max(indent)
        };
        self.replace_line(cursor.line, &content, col);
    }

    fn list_marker_for(&self, kind: ListKind, line_idx: usize) -> String {
        match kind {
            ListKind::Bullet => "* ".to_string(),
            ListKind::Numbered => {
                let previous = line_idx
                    .checked_sub(1)
                    .and_then(|idx| self.line_at(idx))
                    .and_then(|prev| {
                        let rest = prev.trim_start_matches([' ', '\t']);
                        let (len, kind) = list_marker(rest)?;
                        (kind == ListKind::Numbered)
                            .then(|| rest[..len - 2].parse::<u64>().ok())
                            .flatten()
                    });
                format!("{}. ", previous.map_or(1, |n| n + 1))
            }
        }
    }

    /// Insert an empty table below the cursor line and put the cursor on
    /// its first header cell.
    pub fn insert_table(&mut self, columns: usize, rows: usize) {
        let line_idx = self.cursor().line;
        let line_empty = self
            .line_at(line_idx)
            .is_none_or(|line| line.trim().is_empty());
        let (prefix, header_line) = if line_empty {
            ("", line_idx)
        } else {
            ("\n\n", line_idx + 2)
        };
        let suffix = if line_idx + 1 < self.line_count() {
            "\n"
        } else {
            ""
        };
        self.move_end();
        self.insert_str(&format!("{prefix}{}{suffix}", table_skeleton(columns, rows)));
        self.move_to(header_line, 2);
    }
}
