use std::path::PathBuf;

use crate::app::model::{Mode, Model, Prompt, PromptKind, ToastLevel};
use crate::editor::{Direction, EditorBuffer, Emphasis, ListKind, TABLE_COLUMNS, TABLE_ROWS};
use crate::loader::LoadState;
use crate::paste::splice_image_reference;
use crate::service::ContentId;
use crate::worker::WorkerEvent;

/// All possible events and actions in the application.
///
/// These represent user input, system events, and finished background work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Navigation
    /// Scroll up by n lines
    ScrollUp(usize),
    /// Scroll down by n lines
    ScrollDown(usize),
    /// Scroll up one page
    PageUp,
    /// Scroll down one page
    PageDown,
    /// Go to beginning of document
    GoToTop,
    /// Go to end of document
    GoToBottom,

    // Editor
    /// Insert a character at the cursor
    EditorInsertChar(char),
    /// Insert text at the cursor (paste without images)
    EditorInsertText(String),
    /// Delete character before cursor (Backspace)
    EditorDeleteBack,
    /// Delete character at cursor (Delete)
    EditorDeleteForward,
    /// Split line at cursor (Enter)
    EditorSplitLine,
    /// Move cursor in a direction
    EditorMoveCursor(Direction),
    EditorMoveHome,
    EditorMoveEnd,
    EditorMoveWordLeft,
    EditorMoveWordRight,
    EditorMoveToStart,
    EditorMoveToEnd,
    /// Move the cursor up one screen
    EditorPageUp,
    /// Move the cursor down one screen
    EditorPageDown,
    EditorUndo,
    EditorRedo,
    /// Wrap or unwrap the word under the cursor
    EditorToggleEmphasis(Emphasis),
    /// Make the cursor line a list item, or plain text again
    EditorToggleList(ListKind),
    /// Insert an empty table below the cursor line
    EditorInsertTable,
    /// Post the editor text to the content service
    EditorSave,
    /// Show or hide the rendered preview
    TogglePreview,
    /// A paste gesture: bracketed-paste text, or `None` for Ctrl+V
    Paste(Option<String>),

    // Footer prompt
    /// Open a prompt of the given kind
    OpenPrompt(PromptKind),
    /// Replace the prompt text
    PromptInput(String),
    /// Act on the text typed into the prompt
    PromptSubmit,
    /// Close the prompt without loading
    PromptCancel,
    /// Fetch the current identifier again
    Reload,

    /// Background work finished
    Worker(WorkerEvent),

    // Window
    /// Terminal resized
    Resize(u16, u16),
    /// Redraw screen
    Redraw,

    // Application
    /// Quit the application
    Quit,
}

/// Pure function that updates the model based on a message.
///
/// This is the core of TEA - all state transitions happen here. Network
/// work is only queued on the model; the event loop dispatches it.
pub fn update(mut model: Model, msg: Message) -> Model {
    // Reset confirmation on any action other than the confirmed one.
    // EditorSave preserves it so Ctrl+S can complete a pending quit.
    if !matches!(msg, Message::Quit | Message::EditorSave | Message::Worker(_)) {
        model.quit_confirmed = false;
    }

    match msg {
        // Navigation
        Message::ScrollUp(n) => model.viewport.scroll_up(n),
        Message::ScrollDown(n) => model.viewport.scroll_down(n),
        Message::PageUp => model.viewport.page_up(),
        Message::PageDown => model.viewport.page_down(),
        Message::GoToTop => model.viewport.go_to_top(),
        Message::GoToBottom => model.viewport.go_to_bottom(),

        // Editor
        Message::EditorInsertChar(ch) => edit(&mut model, |buf| buf.insert_char(ch)),
        Message::EditorInsertText(text) => edit(&mut model, |buf| buf.insert_str(&text)),
        Message::EditorDeleteBack => edit(&mut model, |buf| {
            buf.delete_back();
        }),
        Message::EditorDeleteForward => edit(&mut model, |buf| {
            buf.delete_forward();
        }),
        Message::EditorSplitLine => edit(&mut model, EditorBuffer::split_line),
        Message::EditorMoveCursor(dir) => edit(&mut model, |buf| buf.move_cursor(dir)),
        Message::EditorMoveHome => edit(&mut model, EditorBuffer::move_home),
        Message::EditorMoveEnd => edit(&mut model, EditorBuffer::move_end),
        Message::EditorMoveWordLeft => edit(&mut model, EditorBuffer::move_word_left),
        Message::EditorMoveWordRight => edit(&mut model, EditorBuffer::move_word_right),
        Message::EditorMoveToStart => edit(&mut model, EditorBuffer::move_to_start),
        Message::EditorMoveToEnd => edit(&mut model, EditorBuffer::move_to_end),
        Message::EditorPageUp => {
            let page = editor_page(&model);
            edit(&mut model, |buf| buf.page_up(page));
        }
        Message::EditorPageDown => {
            let page = editor_page(&model);
            edit(&mut model, |buf| buf.page_down(page));
        }
        Message::EditorUndo => edit(&mut model, |buf| {
            buf.undo();
        }),
        Message::EditorRedo => edit(&mut model, |buf| {
            buf.redo();
        }),
        Message::EditorToggleEmphasis(emphasis) => {
            edit(&mut model, |buf| buf.toggle_emphasis(emphasis));
        }
        Message::EditorToggleList(kind) => edit(&mut model, |buf| buf.toggle_list(kind)),
        Message::EditorInsertTable => {
            edit(&mut model, |buf| buf.insert_table(TABLE_COLUMNS, TABLE_ROWS));
        }
        Message::EditorSave => {
            if model.mode != Mode::Edit {
                return model;
            }
            if model.load_state() != LoadState::Loaded {
                model.show_toast(ToastLevel::Warning, "Content not loaded yet, nothing saved");
                return model;
            }
            let queued = model.save_in_flight();
            if !model.request_save() {
                model.show_toast(ToastLevel::Warning, "Nothing to save");
            } else if queued {
                model.show_toast(ToastLevel::Info, "Save queued");
            }
        }
        Message::TogglePreview => {
            if model.mode == Mode::Edit {
                model.preview_visible = !model.preview_visible;
                model.refresh_preview();
            }
        }
        // Clipboard access happens in the side-effect pass.
        Message::Paste(_) | Message::Redraw => {}

        // Footer prompt
        Message::OpenPrompt(kind) => open_prompt(&mut model, kind),
        Message::PromptInput(text) => {
            if let Some(prompt) = model.prompt.as_mut() {
                prompt.input = text;
            }
        }
        Message::PromptSubmit => {
            if let Some(prompt) = model.prompt.take() {
                submit_prompt(&mut model, &prompt);
            }
        }
        Message::PromptCancel => model.prompt = None,
        Message::Reload => {
            if let Some(id) = model.content_id.clone() {
                model.begin_load(id);
            }
        }

        Message::Worker(event) => apply_worker_event(&mut model, event),

        // Window
        Message::Resize(width, height) => {
            model.viewport.resize(width, height.saturating_sub(1));
            model.editor_viewport.resize(width, height.saturating_sub(1));
            model.editor_ensure_cursor_visible();
            model.reflow_layout();
        }

        // Application
        Message::Quit => {
            if model.editor_is_dirty() && !model.quit_confirmed {
                model.show_toast(
                    ToastLevel::Warning,
                    "Unsaved changes! Press Ctrl+Q again to quit, or Ctrl+S to save",
                );
                model.quit_confirmed = true;
            } else {
                model.should_quit = true;
            }
        }
    }
    model
}

/// Apply `f` to the editor buffer, then keep the cursor and preview in step.
fn edit(model: &mut Model, f: impl FnOnce(&mut EditorBuffer)) {
    let Some(buf) = model.editor_buffer.as_mut() else {
        return;
    };
    f(buf);
    model.editor_ensure_cursor_visible();
    model.refresh_preview();
}

fn editor_page(model: &Model) -> usize {
    usize::from(model.editor_viewport.height().max(1))
}

fn open_prompt(model: &mut Model, kind: PromptKind) {
    match kind {
        PromptKind::OpenId if model.editor_is_dirty() => {
            model.show_toast(
                ToastLevel::Warning,
                "Unsaved changes! Press Ctrl+S to save before opening another id",
            );
        }
        PromptKind::LinkUrl | PromptKind::ImagePath if model.mode != Mode::Edit => {}
        _ => model.prompt = Some(Prompt::new(kind)),
    }
}

fn submit_prompt(model: &mut Model, prompt: &Prompt) {
    let input = prompt.input.trim();
    if input.is_empty() {
        return;
    }
    match prompt.kind {
        PromptKind::OpenId => model.begin_load(ContentId::new(input)),
        PromptKind::LinkUrl => edit(model, |buf| buf.insert_link(input)),
        PromptKind::ImagePath => {
            tracing::debug!(path = input, "image file chosen");
            model.pending_image = Some(PathBuf::from(input));
        }
    }
}

fn apply_worker_event(model: &mut Model, event: WorkerEvent) {
    match event {
        WorkerEvent::Loaded { ticket, result } => {
            if !model.load.settle(&ticket, result.is_ok()) {
                return;
            }
            match result {
                Ok(loaded) => {
                    tracing::info!(
                        id = %ticket.id,
                        origin = ?loaded.origin,
                        bytes = loaded.text.len(),
                        "content loaded"
                    );
                    model.apply_loaded_text(&loaded.text);
                }
                Err(err) => tracing::warn!(id = %ticket.id, %err, "content load failed"),
            }
        }
        WorkerEvent::Rendered { ticket, result } => {
            if !model.load.settle(&ticket, result.is_ok()) {
                return;
            }
            match result {
                Ok(text) => {
                    tracing::info!(id = %ticket.id, bytes = text.len(), "rendered text loaded");
                    model.apply_loaded_text(&text);
                }
                Err(err) => tracing::warn!(id = %ticket.id, %err, "rendered text fetch failed"),
            }
        }
        WorkerEvent::Saved { request, result } => {
            match result {
                Ok(response) => {
                    tracing::info!(
                        id = %request.id,
                        revision = request.revision,
                        %response,
                        "save completed"
                    );
                    let current = model.content_id.as_ref() == Some(&request.id);
                    if current && let Some(buf) = model.editor_buffer.as_mut() {
                        buf.mark_saved(request.revision);
                    }
                }
                Err(err) => tracing::warn!(
                    id = %request.id,
                    revision = request.revision,
                    %err,
                    "save failed"
                ),
            }
            if model.saves.finish() {
                model.request_save();
            }
        }
        WorkerEvent::ImageUploaded { id, location } => {
            if model.mode != Mode::Edit {
                return;
            }
            if model.content_id.as_ref() != Some(&id) {
                tracing::info!(%id, %location, "dropping upload for a document no longer open");
                return;
            }
            let current = model
                .editor_buffer
                .as_ref()
                .map(EditorBuffer::text)
                .unwrap_or_default();
            let Some(text) = splice_image_reference(&current, &location) else {
                tracing::debug!("ignoring empty upload location");
                return;
            };
            tracing::info!(%id, %location, "image reference appended");
            model.editor_buffer.get_or_insert_with(EditorBuffer::empty);
            edit(model, |buf| buf.replace_text(&text));
        }
    }
}
