//! The editor's text surface.
//!
//! A rope-backed buffer with cursor movement, undo history and revision
//! tracking. It holds the document text between a load and a save.

mod buffer;
mod markup;

pub use buffer::{Cursor, Direction, EditorBuffer};
pub use markup::{Emphasis, ListKind, TABLE_COLUMNS, TABLE_ROWS, table_skeleton};
