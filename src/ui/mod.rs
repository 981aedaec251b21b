//! Terminal UI components.
//!
//! This module contains all UI-related code including:
//! - [`viewport`]: Scroll position and visible range management
//! - [`style`]: Colors for markdown and editor chrome

pub mod style;
pub mod viewport;

mod render;
mod status;

pub use render::{document_content_width, line_number_width, render, split_editor_columns};

pub const DOCUMENT_LEFT_PADDING: u16 = 2;
pub const EDITOR_WIDTH_PERCENT: u16 = 50;
pub const PREVIEW_WIDTH_PERCENT: u16 = 50;
