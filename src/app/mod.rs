//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering
//!
//! Network calls never run inside `update`. It records the fetch or save
//! it wants on the model, the event loop hands that to [`crate::worker`],
//! and the result comes back as [`Message::Worker`].

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{Mode, Model, Prompt, PromptKind, ToastLevel};
pub use update::{Message, update};

use std::sync::Arc;

use crate::convert::HtmlConverter;
use crate::service::{ContentId, ContentService};

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    mode: Mode,
    content_id: ContentId,
    service: Arc<dyn ContentService>,
    converter: HtmlConverter,
    preview_visible: bool,
}

impl App {
    /// Edit the content behind `id`.
    pub fn editor(id: ContentId, service: Arc<dyn ContentService>) -> Self {
        Self::new(Mode::Edit, id, service)
    }

    /// Show the rendered text behind `id`.
    pub fn viewer(id: ContentId, service: Arc<dyn ContentService>) -> Self {
        Self::new(Mode::View, id, service)
    }

    fn new(mode: Mode, content_id: ContentId, service: Arc<dyn ContentService>) -> Self {
        Self {
            mode,
            content_id,
            service,
            converter: HtmlConverter::default(),
            preview_visible: true,
        }
    }

    /// Set how legacy HTML content is converted to markdown.
    #[must_use]
    pub fn with_converter(mut self, converter: HtmlConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Set initial preview visibility in the editor.
    #[must_use]
    pub const fn with_preview(mut self, visible: bool) -> Self {
        self.preview_visible = visible;
        self
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("mode", &self.mode)
            .field("content_id", &self.content_id)
            .field("preview_visible", &self.preview_visible)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
