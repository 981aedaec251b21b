//! Markdown rendering for the terminal.
//!
//! This module handles:
//! - Parsing markdown with comrak
//! - Laying it out as styled, width-wrapped lines for display
//!
//! Both the viewer and the editor preview go through
//! [`Document::parse_with_layout`].

mod parser;
mod types;

pub use parser::parse_with_layout;
pub use types::{Document, InlineSpan, InlineStyle, LineType, RenderedLine};
