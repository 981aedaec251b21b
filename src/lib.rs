// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. service::ServiceError)
    clippy::module_name_repetitions
)]

//! # Webpart
//!
//! A terminal editor and viewer for webpart content kept on a remote
//! content service.
//!
//! - `webpart edit <ID>` loads the markdown of a webpart (converting legacy
//!   HTML on the way in), lets you edit it with a live preview, uploads
//!   pasted images and saves the result back.
//! - `webpart view <ID>` shows the text produced by the render service.
//!
//! ## Architecture
//!
//! Webpart uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! Service calls run on worker threads and come back as messages.
//!
//! ## Modules
//!
//! - [`app`]: Main application loop and state
//! - [`service`]: Content service client
//! - [`loader`]: Content loading and stale-result filtering
//! - [`convert`]: Legacy HTML to markdown conversion
//! - [`paste`]: Paste interception and image references
//! - [`save`]: Save requests and coalescing
//! - [`worker`]: Background network work
//! - [`document`]: Markdown rendering to display lines
//! - [`editor`]: Text buffer for the editor
//! - [`ui`]: Terminal UI components

pub mod app;
pub mod clipboard;
pub mod config;
pub mod convert;
pub mod document;
pub mod editor;
pub mod loader;
pub mod paste;
pub mod save;
pub mod service;
pub mod ui;
pub mod worker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::document::Document;
    pub use crate::service::{ContentId, ContentService};
    pub use crate::ui::viewport::Viewport;
}
