use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::document::Document;
use crate::editor::EditorBuffer;
use crate::loader::{LoadState, LoadTicket, LoadTracker};
use crate::save::{SaveQueue, SaveRequest};
use crate::service::ContentId;
use crate::ui::viewport::Viewport;

/// Which view the session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Read-only rendering of the render service's text.
    #[default]
    View,
    /// Markdown editing with an optional live preview.
    Edit,
}

/// What the footer prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Another content identifier to open.
    OpenId,
    /// Target of a link around the word under the cursor.
    LinkUrl,
    /// Path of an image file to upload.
    ImagePath,
}

impl PromptKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenId => "Open id",
            Self::LinkUrl => "Link url",
            Self::ImagePath => "Image file",
        }
    }
}

/// An open footer prompt and what has been typed into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

impl Prompt {
    pub const fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            input: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// The complete application state.
///
/// All state lives here - no global or scattered state. Network work that
/// `update` decides on is parked in `pending_load`/`pending_save` until the
/// event loop hands it to a worker.
pub struct Model {
    pub mode: Mode,
    /// Identifier of the content being shown or edited
    pub content_id: Option<ContentId>,
    pub(super) load: LoadTracker,
    /// Fetch decided on by `update`, not yet handed to a worker
    pub(super) pending_load: Option<LoadTicket>,
    /// Rendered markdown: the viewer's text or the editor preview
    pub document: Document,
    /// Scroll state of the rendered document pane
    pub viewport: Viewport,
    /// The editor text (present in edit mode)
    pub editor_buffer: Option<EditorBuffer>,
    /// Scroll state of the editor text pane
    pub editor_viewport: Viewport,
    /// Whether the editor shows the rendered preview beside the text
    pub preview_visible: bool,
    /// Buffer revision the preview was rendered from
    preview_revision: Option<u64>,
    /// The footer prompt, while it is open
    pub prompt: Option<Prompt>,
    pub(super) saves: SaveQueue,
    /// Save decided on by `update`, not yet handed to a worker
    pub(super) pending_save: Option<SaveRequest>,
    /// Image file chosen for upload, not yet read
    pub(super) pending_image: Option<PathBuf>,
    toast: Option<Toast>,
    /// Set after first quit attempt with unsaved editor changes; allows second quit to proceed
    pub quit_confirmed: bool,
    /// Whether the app should quit
    pub should_quit: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("mode", &self.mode)
            .field("content_id", &self.content_id)
            .field("load_state", &self.load.state())
            .field("preview_visible", &self.preview_visible)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create a model for `mode` sized to the terminal.
    pub fn new(mode: Mode, terminal_size: (u16, u16)) -> Self {
        let (width, height) = terminal_size;
        let body_height = height.saturating_sub(1);
        let editor_buffer = (mode == Mode::Edit).then(EditorBuffer::empty);
        let editor_lines = editor_buffer.as_ref().map_or(0, EditorBuffer::line_count);
        let mut model = Self {
            mode,
            viewport: Viewport::new(width, body_height, 0),
            editor_buffer,
            editor_viewport: Viewport::new(width, body_height, editor_lines),
            preview_visible: mode == Mode::Edit,
            ..Self::default()
        };
        model.refresh_preview();
        model
    }

    /// Show or hide the editor preview.
    #[must_use]
    pub fn with_preview(mut self, visible: bool) -> Self {
        self.preview_visible = visible;
        self.preview_revision = None;
        self.refresh_preview();
        self
    }

    pub const fn load_state(&self) -> LoadState {
        self.load.state()
    }

    /// Whether the rendered document is drawn beside the editor text.
    pub fn shows_preview(&self) -> bool {
        self.mode == Mode::Edit && self.preview_visible
    }

    /// Whether a save is running.
    pub const fn save_in_flight(&self) -> bool {
        self.saves.in_flight().is_some()
    }

    /// Whether the editor has unsaved changes.
    pub fn editor_is_dirty(&self) -> bool {
        self.mode == Mode::Edit
            && self
                .editor_buffer
                .as_ref()
                .is_some_and(EditorBuffer::is_dirty)
    }

    /// Columns available to rendered markdown.
    pub(super) fn layout_width(&self) -> u16 {
        crate::ui::document_content_width(self.viewport.width(), self.shows_preview())
    }

    /// Point the session at `id` and queue its fetch.
    ///
    /// Any fetch still running for an earlier identifier is superseded.
    pub(super) fn begin_load(&mut self, id: ContentId) {
        let ticket = self.load.begin(id.clone());
        tracing::debug!(%id, generation = ticket.generation, "load queued");
        self.content_id = Some(id);
        self.pending_load = Some(ticket);
    }

    /// Push freshly fetched text into the surface for the current mode.
    pub(super) fn apply_loaded_text(&mut self, text: &str) {
        match self.mode {
            Mode::Edit => {
                let buf = self.editor_buffer.get_or_insert_with(EditorBuffer::empty);
                buf.load_text(text);
                self.editor_viewport.set_total_lines(buf.line_count());
                self.editor_viewport.go_to_top();
                self.refresh_preview();
            }
            Mode::View => {
                self.document = Document::parse_with_layout(text, self.layout_width());
                self.viewport.set_total_lines(self.document.line_count());
                self.viewport.go_to_top();
            }
        }
    }

    /// Ask for a save of the current editor text.
    ///
    /// Returns `false` when there is nothing to save. Until the content of
    /// the current identifier has loaded, the buffer does not hold that
    /// content, so nothing is saved. A request made while a save is in
    /// flight is folded into its follow-up.
    pub(super) fn request_save(&mut self) -> bool {
        if self.load.state() != LoadState::Loaded {
            tracing::debug!(state = ?self.load.state(), "save refused before content loaded");
            return false;
        }
        let (Some(id), Some(buf)) = (self.content_id.clone(), self.editor_buffer.as_ref()) else {
            return false;
        };
        let revision = buf.revision();
        if self.saves.request(revision) {
            self.pending_save = Some(SaveRequest::new(id, buf.text(), revision));
        } else {
            tracing::debug!(revision, "save coalesced into follow-up");
        }
        true
    }

    /// Re-render for the current terminal width.
    pub(super) fn reflow_layout(&mut self) {
        match self.mode {
            Mode::Edit => self.refresh_preview(),
            Mode::View => {
                let width = self.layout_width();
                if self.document.width() == width {
                    return;
                }
                let document = Document::parse_with_layout(self.document.source(), width);
                self.document = document;
                self.viewport.set_total_lines(self.document.line_count());
            }
        }
    }

    /// Bring the preview up to date with the editor text and scroll it
    /// alongside the editor.
    pub(super) fn refresh_preview(&mut self) {
        if !self.shows_preview() {
            return;
        }
        let width = self.layout_width();
        let Some(buf) = self.editor_buffer.as_ref() else {
            return;
        };
        let revision = buf.revision();
        if self.preview_revision != Some(revision) || self.document.width() != width {
            self.document = Document::parse_with_layout(&buf.text(), width);
            self.viewport.set_total_lines(self.document.line_count());
            self.preview_revision = Some(revision);
        }
        let source_lines = buf.line_count().max(1);
        let target = self.editor_viewport.offset() * self.document.line_count() / source_lines;
        self.viewport.go_to_top();
        self.viewport.scroll_down(target);
    }

    /// Keep the editor cursor line on screen.
    pub(super) fn editor_ensure_cursor_visible(&mut self) {
        let Some(buf) = &self.editor_buffer else {
            return;
        };
        self.editor_viewport.set_total_lines(buf.line_count());
        self.editor_viewport.ensure_visible(buf.cursor().line);
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}

// Implement Default for Model to allow std::mem::take
impl Default for Model {
    fn default() -> Self {
        Self {
            mode: Mode::View,
            content_id: None,
            load: LoadTracker::new(),
            pending_load: None,
            document: Document::empty(),
            viewport: Viewport::new(80, 23, 0),
            editor_buffer: None,
            editor_viewport: Viewport::new(80, 23, 0),
            preview_visible: false,
            preview_revision: None,
            prompt: None,
            saves: SaveQueue::new(),
            pending_save: None,
            pending_image: None,
            toast: None,
            quit_confirmed: false,
            should_quit: false,
        }
    }
}
