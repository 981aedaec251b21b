use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::clipboard::{ClipboardError, ClipboardSource};
use crate::convert::HtmlConverter;
use crate::editor::{Direction, Emphasis, ListKind};
use crate::loader::{LoadState, LoadTicket, LoadedText, Origin};
use crate::paste::ClipboardItem;
use crate::save::SaveRequest;
use crate::service::fake::FakeService;
use crate::service::{ContentId, ContentPayload, ContentService, ServiceError};
use crate::worker::{WorkerEvent, Workers};

use super::effects::ClipboardSlot;
use super::event_loop::ResizeDebouncer;
use super::{App, Message, Mode, Model, PromptKind, ToastLevel, update};

const WAIT: Duration = Duration::from_secs(5);

fn create_editor_model() -> Model {
    let mut model = Model::new(Mode::Edit, (80, 24));
    model.begin_load(ContentId::new("42"));
    model
}

fn create_viewer_model() -> Model {
    let mut model = Model::new(Mode::View, (80, 24));
    model.begin_load(ContentId::new("42"));
    model
}

fn current_ticket(model: &Model) -> LoadTicket {
    LoadTicket {
        id: model.content_id.clone().unwrap(),
        generation: model.load.generation(),
    }
}

/// Answer the queued fetch, as if a worker had run it.
fn loaded(mut model: Model, text: &str) -> Model {
    let ticket = model
        .pending_load
        .take()
        .unwrap_or_else(|| current_ticket(&model));
    update(
        model,
        Message::Worker(WorkerEvent::Loaded {
            ticket,
            result: Ok(LoadedText {
                text: text.to_string(),
                origin: Origin::Markup,
            }),
        }),
    )
}

fn rendered(mut model: Model, text: &str) -> Model {
    let ticket = model
        .pending_load
        .take()
        .unwrap_or_else(|| current_ticket(&model));
    update(
        model,
        Message::Worker(WorkerEvent::Rendered {
            ticket,
            result: Ok(text.to_string()),
        }),
    )
}

fn editor_text(model: &Model) -> String {
    model.editor_buffer.as_ref().unwrap().text()
}

fn type_text(mut model: Model, text: &str) -> Model {
    for ch in text.chars() {
        model = update(model, Message::EditorInsertChar(ch));
    }
    model
}

fn uploaded(model: Model, id: &str, location: &str) -> Model {
    update(
        model,
        Message::Worker(WorkerEvent::ImageUploaded {
            id: ContentId::new(id),
            location: location.to_string(),
        }),
    )
}

fn saved(model: Model, request: SaveRequest) -> Model {
    update(
        model,
        Message::Worker(WorkerEvent::Saved {
            request,
            result: Ok(serde_json::json!({ "status": "ok" })),
        }),
    )
}

fn start_workers(service: FakeService) -> (Workers, Arc<FakeService>) {
    let service = Arc::new(service);
    let shared: Arc<dyn ContentService> = service.clone();
    (Workers::new(shared, HtmlConverter::default()), service)
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

struct StubClipboard {
    text: Option<String>,
    image: Option<ClipboardItem>,
    broken: bool,
}

impl StubClipboard {
    fn slot(text: Option<&str>, image: Option<ClipboardItem>) -> ClipboardSlot {
        Some(Box::new(Self {
            text: text.map(ToString::to_string),
            image,
            broken: false,
        }))
    }

    fn broken() -> ClipboardSlot {
        Some(Box::new(Self {
            text: None,
            image: None,
            broken: true,
        }))
    }
}

impl ClipboardSource for StubClipboard {
    fn image(&mut self) -> Result<Option<ClipboardItem>, ClipboardError> {
        if self.broken {
            return Err(ClipboardError::Unavailable("no display".to_string()));
        }
        Ok(self.image.clone())
    }

    fn text(&mut self) -> Result<Option<String>, ClipboardError> {
        if self.broken {
            return Err(ClipboardError::Unavailable("no display".to_string()));
        }
        Ok(self.text.clone())
    }
}

// Loading

#[test]
fn test_mount_queues_one_load() {
    let model = create_editor_model();
    assert_eq!(model.load_state(), LoadState::Loading);
    assert_eq!(model.pending_load, Some(current_ticket(&model)));
}

#[test]
fn test_loaded_text_fills_editor_clean() {
    let model = loaded(create_editor_model(), "# Hi\n\nbody");
    assert_eq!(editor_text(&model), "# Hi\n\nbody");
    assert_eq!(model.load_state(), LoadState::Loaded);
    assert!(!model.editor_is_dirty());
}

#[test]
fn test_loaded_text_updates_preview() {
    let model = loaded(create_editor_model(), "# Hi");
    assert_eq!(model.document.line_at(0).unwrap().content(), "# Hi");
}

#[test]
fn test_load_failure_leaves_text_unchanged() {
    let model = type_text(create_editor_model(), "draft");
    let ticket = current_ticket(&model);
    let model = update(
        model,
        Message::Worker(WorkerEvent::Loaded {
            ticket,
            result: Err(ServiceError::BadStatus {
                status: 500,
                reason: "Internal Server Error".to_string(),
            }),
        }),
    );
    assert_eq!(editor_text(&model), "draft");
    assert_eq!(model.load_state(), LoadState::Failed);
    assert!(model.active_toast().is_none());
}

#[test]
fn test_stale_load_result_is_ignored() {
    let model = create_editor_model();
    let stale = current_ticket(&model);
    let model = update(model, Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptInput("43".to_string()));
    let model = update(model, Message::PromptSubmit);
    let model = update(
        model,
        Message::Worker(WorkerEvent::Loaded {
            ticket: stale,
            result: Ok(LoadedText {
                text: "old".to_string(),
                origin: Origin::Markup,
            }),
        }),
    );
    assert_eq!(editor_text(&model), "");
    assert_eq!(model.load_state(), LoadState::Loading);

    let model = loaded(model, "new");
    assert_eq!(editor_text(&model), "new");
}

#[test]
fn test_duplicate_result_for_settled_ticket_is_ignored() {
    let model = loaded(create_editor_model(), "first");
    let model = loaded(model, "second");
    assert_eq!(editor_text(&model), "first");
}

#[test]
fn test_viewer_renders_fetched_text() {
    let model = rendered(create_viewer_model(), "# Title\n\nbody");
    assert_eq!(model.document.source(), "# Title\n\nbody");
    assert_eq!(model.viewport.total_lines(), 3);
    assert!(model.editor_buffer.is_none());
}

#[test]
fn test_viewer_render_failure_keeps_document() {
    let model = rendered(create_viewer_model(), "kept");
    let model = update(model, Message::Reload);
    let ticket = current_ticket(&model);
    let model = update(
        model,
        Message::Worker(WorkerEvent::Rendered {
            ticket,
            result: Err(ServiceError::Network("refused".to_string())),
        }),
    );
    assert_eq!(model.document.source(), "kept");
}

#[test]
fn test_reload_queues_new_ticket_for_same_id() {
    let model = rendered(create_viewer_model(), "x");
    let before = model.load.generation();
    let mut model = update(model, Message::Reload);
    let ticket = model.pending_load.take().unwrap();
    assert_eq!(ticket.id, ContentId::new("42"));
    assert_eq!(ticket.generation, before + 1);
}

// Prompt

#[test]
fn test_prompt_submit_switches_identifier() {
    let model = rendered(create_viewer_model(), "x");
    let model = update(model, Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptInput(" 77 ".to_string()));
    let model = update(model, Message::PromptSubmit);
    assert!(model.prompt.is_none());
    assert_eq!(model.content_id, Some(ContentId::new("77")));
    assert_eq!(model.pending_load.as_ref().unwrap().id, ContentId::new("77"));
}

#[test]
fn test_empty_prompt_submit_does_nothing() {
    let mut model = rendered(create_viewer_model(), "x");
    model.pending_load = None;
    let model = update(model, Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptSubmit);
    assert!(model.pending_load.is_none());
    assert_eq!(model.content_id, Some(ContentId::new("42")));
}

#[test]
fn test_prompt_cancel_closes_prompt() {
    let model = update(create_viewer_model(), Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptCancel);
    assert!(model.prompt.is_none());
}

#[test]
fn test_open_prompt_refused_with_unsaved_changes() {
    let model = type_text(loaded(create_editor_model(), ""), "x");
    let model = update(model, Message::OpenPrompt(PromptKind::OpenId));
    assert!(model.prompt.is_none());
    let (message, level) = model.active_toast().unwrap();
    assert_eq!(level, ToastLevel::Warning);
    assert!(message.starts_with("Unsaved changes!"));
}

// Editing

#[test]
fn test_typing_marks_dirty_and_refreshes_preview() {
    let model = loaded(create_editor_model(), "");
    let model = type_text(model, "# Hi");
    assert!(model.editor_is_dirty());
    assert_eq!(model.document.line_at(0).unwrap().content(), "# Hi");
}

#[test]
fn test_editor_keys_move_cursor() {
    let model = loaded(create_editor_model(), "abc\ndef");
    let model = update(model, Message::EditorMoveCursor(Direction::Down));
    let model = update(model, Message::EditorMoveEnd);
    let cursor = model.editor_buffer.as_ref().unwrap().cursor();
    assert_eq!((cursor.line, cursor.col), (1, 3));
}

#[test]
fn test_editor_page_down_keeps_cursor_visible() {
    let text = (0..100).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
    let model = loaded(create_editor_model(), &text);
    let model = update(model, Message::EditorPageDown);
    let model = update(model, Message::EditorPageDown);
    let line = model.editor_buffer.as_ref().unwrap().cursor().line;
    assert_eq!(line, 46);
    assert!(model.editor_viewport.visible_range().contains(&line));
}

#[test]
fn test_preview_follows_editor_scroll() {
    let text = (0..100)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    let model = loaded(create_editor_model(), &text);
    let model = update(model, Message::EditorMoveToEnd);
    assert!(model.editor_viewport.offset() > 0);
    assert!(model.viewport.offset() > 0);
}

#[test]
fn test_toggle_preview_flips_visibility() {
    let model = create_editor_model();
    assert!(model.shows_preview());
    let model = update(model, Message::TogglePreview);
    assert!(!model.shows_preview());
}

#[test]
fn test_toggle_preview_ignored_in_viewer() {
    let model = update(create_viewer_model(), Message::TogglePreview);
    assert!(!model.preview_visible);
}

// Toolbar

#[test]
fn test_undo_and_redo_restore_text() {
    let model = type_text(loaded(create_editor_model(), "a"), "bc");
    let model = update(model, Message::EditorUndo);
    assert_eq!(editor_text(&model), "a");
    assert_eq!(model.document.line_at(0).unwrap().content(), "a");
    let model = update(model, Message::EditorRedo);
    assert_eq!(editor_text(&model), "bca");
}

#[test]
fn test_undo_does_not_reach_before_load() {
    let model = type_text(create_editor_model(), "draft");
    let model = loaded(model, "server text");
    let model = update(model, Message::EditorUndo);
    assert_eq!(editor_text(&model), "server text");
    assert!(!model.editor_is_dirty());
}

#[test]
fn test_emphasis_and_list_messages_format_text() {
    let model = loaded(create_editor_model(), "word");
    let model = update(model, Message::EditorToggleEmphasis(Emphasis::Bold));
    let model = update(model, Message::EditorToggleList(ListKind::Bullet));
    assert_eq!(editor_text(&model), "* **word**");
    assert!(model.editor_is_dirty());
}

#[test]
fn test_insert_table_message_adds_skeleton() {
    let model = update(loaded(create_editor_model(), ""), Message::EditorInsertTable);
    assert_eq!(
        editor_text(&model),
        "| Column 1 | Column 2 | Column 3 |\n| --- | --- | --- |\n|  |  |  |\n|  |  |  |"
    );
}

#[test]
fn test_link_prompt_links_word_under_cursor() {
    let model = loaded(create_editor_model(), "see docs");
    let model = update(model, Message::EditorMoveEnd);
    let model = update(model, Message::OpenPrompt(PromptKind::LinkUrl));
    assert_eq!(model.prompt.as_ref().unwrap().kind, PromptKind::LinkUrl);
    let model = update(model, Message::PromptInput(" https://x.test ".to_string()));
    let model = update(model, Message::PromptSubmit);
    assert!(model.prompt.is_none());
    assert_eq!(editor_text(&model), "see [docs](https://x.test)");
}

#[test]
fn test_link_prompt_allowed_with_unsaved_changes() {
    let model = type_text(loaded(create_editor_model(), ""), "x");
    let model = update(model, Message::OpenPrompt(PromptKind::LinkUrl));
    assert!(model.prompt.is_some());
}

#[test]
fn test_editor_prompts_ignored_in_viewer() {
    let model = update(create_viewer_model(), Message::OpenPrompt(PromptKind::LinkUrl));
    assert!(model.prompt.is_none());
    let model = update(model, Message::OpenPrompt(PromptKind::ImagePath));
    assert!(model.prompt.is_none());
}

#[test]
fn test_image_prompt_queues_file() {
    let model = loaded(create_editor_model(), "");
    let model = update(model, Message::OpenPrompt(PromptKind::ImagePath));
    let model = update(model, Message::PromptInput("/tmp/shot.png".to_string()));
    let mut model = update(model, Message::PromptSubmit);
    assert_eq!(
        model.pending_image.take(),
        Some(std::path::PathBuf::from("/tmp/shot.png"))
    );
}

// Saving

#[test]
fn test_save_queues_request_with_current_text() {
    let model = type_text(loaded(create_editor_model(), ""), "# Hi");
    let mut model = update(model, Message::EditorSave);
    let request = model.pending_save.take().unwrap();
    assert_eq!(request.id, ContentId::new("42"));
    assert_eq!(request.text, "# Hi");
    assert!(model.save_in_flight());
}

#[test]
fn test_successful_save_marks_clean() {
    let model = type_text(loaded(create_editor_model(), ""), "x");
    let mut model = update(model, Message::EditorSave);
    let request = model.pending_save.take().unwrap();
    let model = saved(model, request);
    assert!(!model.editor_is_dirty());
    assert!(!model.save_in_flight());
    assert!(model.active_toast().is_none());
}

#[test]
fn test_save_after_further_edits_stays_dirty() {
    let model = type_text(loaded(create_editor_model(), ""), "x");
    let mut model = update(model, Message::EditorSave);
    let request = model.pending_save.take().unwrap();
    let model = type_text(model, "y");
    let model = saved(model, request);
    assert!(model.editor_is_dirty());
}

#[test]
fn test_failed_save_stays_dirty_without_toast() {
    let model = type_text(loaded(create_editor_model(), ""), "x");
    let mut model = update(model, Message::EditorSave);
    let request = model.pending_save.take().unwrap();
    let model = update(
        model,
        Message::Worker(WorkerEvent::Saved {
            request,
            result: Err(ServiceError::Network("refused".to_string())),
        }),
    );
    assert!(model.editor_is_dirty());
    assert!(!model.save_in_flight());
    assert!(model.active_toast().is_none());
}

#[test]
fn test_overlapping_saves_coalesce_into_one_follow_up() {
    let model = type_text(loaded(create_editor_model(), ""), "a");
    let mut model = update(model, Message::EditorSave);
    let first = model.pending_save.take().unwrap();

    let model = type_text(model, "b");
    let model = update(model, Message::EditorSave);
    let model = type_text(model, "c");
    let mut model = update(model, Message::EditorSave);
    assert!(model.pending_save.is_none());
    assert_eq!(model.active_toast(), Some(("Save queued", ToastLevel::Info)));

    let mut model = saved(model, first);
    let follow_up = model.pending_save.take().unwrap();
    assert_eq!(follow_up.text, "abc");
    assert!(model.save_in_flight());

    let model = saved(model, follow_up);
    assert!(!model.editor_is_dirty());
    assert!(model.pending_save.is_none());
}

#[test]
fn test_save_refused_before_first_load() {
    let model = type_text(create_editor_model(), "x");
    let model = update(model, Message::EditorSave);
    assert!(model.pending_save.is_none());
    assert!(!model.save_in_flight());
    assert_eq!(
        model.active_toast(),
        Some(("Content not loaded yet, nothing saved", ToastLevel::Warning))
    );
}

#[test]
fn test_save_refused_after_load_failure() {
    let model = create_editor_model();
    let ticket = current_ticket(&model);
    let model = update(
        model,
        Message::Worker(WorkerEvent::Loaded {
            ticket,
            result: Err(ServiceError::Network("refused".to_string())),
        }),
    );
    let model = update(type_text(model, "x"), Message::EditorSave);
    assert!(model.pending_save.is_none());
}

#[test]
fn test_save_waits_for_newly_opened_identifier() {
    let model = loaded(create_editor_model(), "content of 42");
    let model = update(model, Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptInput("43".to_string()));
    let model = update(model, Message::PromptSubmit);
    let model = update(type_text(model, "!"), Message::EditorSave);
    assert!(model.pending_save.is_none());

    let model = type_text(loaded(model, "content of 43"), "!");
    let mut model = update(model, Message::EditorSave);
    let request = model.pending_save.take().unwrap();
    assert_eq!(request.id, ContentId::new("43"));
    assert_eq!(request.text, "!content of 43");
}

#[test]
fn test_follow_up_save_dropped_after_switching_identifier() {
    let model = loaded(create_editor_model(), "a");
    let mut model = update(model, Message::EditorSave);
    let first = model.pending_save.take().unwrap();
    let model = update(model, Message::EditorSave);
    let model = update(model, Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptInput("43".to_string()));
    let model = update(model, Message::PromptSubmit);

    let model = saved(model, first);
    assert!(model.pending_save.is_none());
    assert!(!model.save_in_flight());
}

#[test]
fn test_save_ignored_in_viewer() {
    let model = update(create_viewer_model(), Message::EditorSave);
    assert!(model.pending_save.is_none());
    assert!(model.active_toast().is_none());
}

// Pasted images

#[test]
fn test_uploaded_image_appends_reference() {
    let model = uploaded(loaded(create_editor_model(), "A"), "42", "https://x/img.png");
    assert_eq!(editor_text(&model), "A\n\n![Pasted Image](https://x/img.png)");
    assert!(model.editor_is_dirty());
}

#[test]
fn test_uploads_append_in_arrival_order() {
    let mut model = loaded(create_editor_model(), "");
    for location in ["u1", "u2"] {
        model = uploaded(model, "42", location);
    }
    assert_eq!(
        editor_text(&model),
        "\n\n![Pasted Image](u1)\n\n![Pasted Image](u2)"
    );
}

#[test]
fn test_empty_upload_location_is_ignored() {
    let model = uploaded(loaded(create_editor_model(), "A"), "42", "");
    assert_eq!(editor_text(&model), "A");
    assert!(!model.editor_is_dirty());
}

#[test]
fn test_upload_for_previous_document_is_dropped() {
    let model = loaded(create_editor_model(), "content of 42");
    let model = update(model, Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptInput("43".to_string()));
    let model = update(model, Message::PromptSubmit);
    let model = loaded(model, "content of 43");

    let model = uploaded(model, "42", "https://x/late.png");
    assert_eq!(editor_text(&model), "content of 43");
    assert!(!model.editor_is_dirty());
}

// Quit

#[test]
fn test_quit_when_clean_exits_immediately() {
    let model = loaded(create_editor_model(), "x");
    let model = update(model, Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_quit_with_unsaved_changes_needs_confirmation() {
    let model = type_text(loaded(create_editor_model(), ""), "x");
    let model = update(model, Message::Quit);
    assert!(!model.should_quit);
    assert!(model.quit_confirmed);
    let model = update(model, Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_other_action_cancels_quit_confirmation() {
    let model = type_text(loaded(create_editor_model(), ""), "x");
    let model = update(model, Message::Quit);
    let model = update(model, Message::EditorMoveHome);
    assert!(!model.quit_confirmed);
    let model = update(model, Message::Quit);
    assert!(!model.should_quit);
}

#[test]
fn test_save_and_worker_results_keep_quit_confirmation() {
    let model = type_text(loaded(create_editor_model(), ""), "x");
    let model = update(model, Message::Quit);
    let mut model = update(model, Message::EditorSave);
    let request = model.pending_save.take().unwrap();
    let model = saved(model, request);
    assert!(model.quit_confirmed);
}

// Window

#[test]
fn test_resize_reflows_viewer_document() {
    let model = rendered(create_viewer_model(), &"word ".repeat(40));
    let narrow = update(model, Message::Resize(40, 24));
    assert_eq!(narrow.document.width(), 38);
    assert!(narrow.document.line_count() > 2);
    assert_eq!(narrow.viewport.height(), 23);
}

#[test]
fn test_resize_reflows_preview() {
    let model = loaded(create_editor_model(), "text");
    let model = update(model, Message::Resize(120, 30));
    assert_eq!(model.document.width(), 58);
    assert_eq!(model.editor_viewport.height(), 29);
}

#[test]
fn test_resize_debouncer_waits_for_delay() {
    let mut debouncer = ResizeDebouncer::new(100);
    debouncer.queue(100, 40, 1_000);
    assert!(debouncer.is_pending());
    assert_eq!(debouncer.take_ready(1_050), None);
    assert_eq!(debouncer.take_ready(1_100), Some((100, 40)));
    assert!(!debouncer.is_pending());
}

#[test]
fn test_resize_debouncer_keeps_latest_size() {
    let mut debouncer = ResizeDebouncer::new(100);
    debouncer.queue(100, 40, 1_000);
    debouncer.queue(90, 30, 1_050);
    assert_eq!(debouncer.take_ready(1_100), None);
    assert_eq!(debouncer.take_ready(1_150), Some((90, 30)));
}

// Input mapping

#[test]
fn test_editor_control_keys() {
    let model = create_editor_model();
    assert_eq!(App::handle_key(ctrl('s'), &model), Some(Message::EditorSave));
    assert_eq!(App::handle_key(ctrl('q'), &model), Some(Message::Quit));
    assert_eq!(App::handle_key(ctrl('v'), &model), Some(Message::Paste(None)));
    assert_eq!(App::handle_key(ctrl('p'), &model), Some(Message::TogglePreview));
    assert_eq!(
        App::handle_key(ctrl('o'), &model),
        Some(Message::OpenPrompt(PromptKind::OpenId))
    );
}

#[test]
fn test_editor_toolbar_keys() {
    let model = create_editor_model();
    assert_eq!(App::handle_key(ctrl('z'), &model), Some(Message::EditorUndo));
    assert_eq!(App::handle_key(ctrl('y'), &model), Some(Message::EditorRedo));
    assert_eq!(
        App::handle_key(ctrl('b'), &model),
        Some(Message::EditorToggleEmphasis(Emphasis::Bold))
    );
    assert_eq!(
        App::handle_key(ctrl('e'), &model),
        Some(Message::EditorToggleEmphasis(Emphasis::Italic))
    );
    assert_eq!(
        App::handle_key(ctrl('u'), &model),
        Some(Message::EditorToggleEmphasis(Emphasis::Underline))
    );
    assert_eq!(
        App::handle_key(ctrl('k'), &model),
        Some(Message::OpenPrompt(PromptKind::LinkUrl))
    );
    assert_eq!(
        App::handle_key(ctrl('l'), &model),
        Some(Message::EditorToggleList(ListKind::Bullet))
    );
    assert_eq!(
        App::handle_key(ctrl('n'), &model),
        Some(Message::EditorToggleList(ListKind::Numbered))
    );
    assert_eq!(
        App::handle_key(ctrl('g'), &model),
        Some(Message::OpenPrompt(PromptKind::ImagePath))
    );
    assert_eq!(App::handle_key(ctrl('t'), &model), Some(Message::EditorInsertTable));
}

#[test]
fn test_editor_plain_letters_insert() {
    let model = create_editor_model();
    assert_eq!(
        App::handle_key(key(KeyCode::Char('q')), &model),
        Some(Message::EditorInsertChar('q'))
    );
    assert_eq!(
        App::handle_key(KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT), &model),
        Some(Message::EditorInsertChar('Q'))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Enter), &model),
        Some(Message::EditorSplitLine)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::PageDown), &model),
        Some(Message::EditorPageDown)
    );
}

#[test]
fn test_viewer_keys() {
    let model = rendered(
        create_viewer_model(),
        &(0..100).map(|i| i.to_string()).collect::<Vec<_>>().join("\n\n"),
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('j')), &model),
        Some(Message::ScrollDown(1))
    );
    assert_eq!(App::handle_key(key(KeyCode::Char('k')), &model), None);
    assert_eq!(
        App::handle_key(key(KeyCode::Char(' ')), &model),
        Some(Message::PageDown)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('G')), &model),
        Some(Message::GoToBottom)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('r')), &model),
        Some(Message::Reload)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('o')), &model),
        Some(Message::OpenPrompt(PromptKind::OpenId))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('q')), &model),
        Some(Message::Quit)
    );
}

#[test]
fn test_prompt_captures_keys() {
    let model = update(create_viewer_model(), Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptInput("4".to_string()));
    assert_eq!(
        App::handle_key(key(KeyCode::Char('q')), &model),
        Some(Message::PromptInput("4q".to_string()))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Backspace), &model),
        Some(Message::PromptInput(String::new()))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Enter), &model),
        Some(Message::PromptSubmit)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Esc), &model),
        Some(Message::PromptCancel)
    );
}

#[test]
fn test_bracketed_paste_only_in_editor() {
    let mut debouncer = ResizeDebouncer::new(100);
    let paste = Event::Paste("hello".to_string());
    let editor = create_editor_model();
    assert_eq!(
        App::handle_event(&paste, &editor, 0, &mut debouncer),
        Some(Message::Paste(Some("hello".to_string())))
    );
    let viewer = create_viewer_model();
    assert_eq!(App::handle_event(&paste, &viewer, 0, &mut debouncer), None);
}

#[test]
fn test_key_release_is_ignored() {
    let mut debouncer = ResizeDebouncer::new(100);
    let mut release = ctrl('s');
    release.kind = KeyEventKind::Release;
    let model = create_editor_model();
    assert_eq!(
        App::handle_event(&Event::Key(release), &model, 0, &mut debouncer),
        None
    );
}

#[test]
fn test_resize_event_is_debounced() {
    let mut debouncer = ResizeDebouncer::new(100);
    let model = create_viewer_model();
    assert_eq!(
        App::handle_event(&Event::Resize(100, 30), &model, 0, &mut debouncer),
        None
    );
    assert_eq!(debouncer.take_ready(100), Some((100, 30)));
}

// Side effects

#[test]
fn test_text_paste_inserts_at_cursor() {
    let (mut workers, _) = start_workers(FakeService::new());
    let mut model = loaded(create_editor_model(), "ab");
    model = update(model, Message::EditorMoveCursor(Direction::Right));
    let mut clipboard = StubClipboard::slot(None, None);
    App::handle_message_side_effects(
        &mut model,
        &mut workers,
        &mut clipboard,
        &Message::Paste(Some("XY".to_string())),
    );
    assert_eq!(editor_text(&model), "aXYb");
}

#[test]
fn test_ctrl_v_reads_clipboard_text() {
    let (mut workers, _) = start_workers(FakeService::new());
    let mut model = loaded(create_editor_model(), "");
    let mut clipboard = StubClipboard::slot(Some("from clipboard"), None);
    App::handle_message_side_effects(&mut model, &mut workers, &mut clipboard, &Message::Paste(None));
    assert_eq!(editor_text(&model), "from clipboard");
}

#[test]
fn test_image_paste_uploads_and_appends_reference() {
    let (mut workers, service) =
        start_workers(FakeService::new().with_locations(&["https://x/img.png"]));
    let mut model = loaded(create_editor_model(), "A");
    let png = ClipboardItem::new("image/png", vec![0x89, b'P', b'N', b'G']);
    let mut clipboard = StubClipboard::slot(Some("ignored text"), Some(png));
    App::handle_message_side_effects(&mut model, &mut workers, &mut clipboard, &Message::Paste(None));

    // Default handling is suppressed: the text is not inserted.
    assert_eq!(editor_text(&model), "A");
    assert_eq!(
        model.active_toast(),
        Some(("Uploading pasted image", ToastLevel::Info))
    );

    let event = workers.recv_timeout(WAIT).unwrap();
    let model = update(model, Message::Worker(event));
    assert_eq!(editor_text(&model), "A\n\n![Pasted Image](https://x/img.png)");
    assert_eq!(service.uploads().len(), 1);
    assert_eq!(service.uploads()[0].mime, "image/png");
}

#[test]
fn test_failed_upload_leaves_document_unchanged() {
    let (mut workers, service) = start_workers(FakeService::new());
    let mut model = loaded(create_editor_model(), "A");
    let png = ClipboardItem::new("image/png", vec![1]);
    let mut clipboard = StubClipboard::slot(None, Some(png));
    App::handle_message_side_effects(&mut model, &mut workers, &mut clipboard, &Message::Paste(None));
    assert!(workers.recv_timeout(Duration::from_millis(300)).is_none());
    assert_eq!(service.uploads().len(), 1);
    assert_eq!(editor_text(&model), "A");
}

#[test]
fn test_image_file_uploads_and_appends_reference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chart.png");
    std::fs::write(&path, [7, 8, 9]).unwrap();

    let (mut workers, service) =
        start_workers(FakeService::new().with_locations(&["https://x/chart.png"]));
    let model = loaded(create_editor_model(), "A");
    let model = update(model, Message::OpenPrompt(PromptKind::ImagePath));
    let model = update(model, Message::PromptInput(path.display().to_string()));
    let mut model = update(model, Message::PromptSubmit);
    App::dispatch_pending_work(&mut model, &mut workers);
    assert_eq!(
        model.active_toast(),
        Some(("Uploading chart.png", ToastLevel::Info))
    );

    let event = workers.recv_timeout(WAIT).unwrap();
    let model = update(model, Message::Worker(event));
    assert_eq!(editor_text(&model), "A\n\n![Pasted Image](https://x/chart.png)");
    let uploads = service.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name, "chart.png");
    assert_eq!(uploads[0].mime, "image/png");
    assert_eq!(uploads[0].bytes, vec![7, 8, 9]);
}

#[test]
fn test_missing_image_file_shows_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut workers, service) = start_workers(FakeService::new());
    let mut model = loaded(create_editor_model(), "A");
    model.pending_image = Some(dir.path().join("missing.png"));
    App::dispatch_pending_work(&mut model, &mut workers);
    let (message, level) = model.active_toast().unwrap();
    assert_eq!(level, ToastLevel::Error);
    assert!(message.starts_with("Image not uploaded"));
    assert!(service.uploads().is_empty());
    assert_eq!(editor_text(&model), "A");
}

#[test]
fn test_pasted_upload_is_dropped_after_switching_document() {
    let (mut workers, _) = start_workers(FakeService::new().with_locations(&["u1"]));
    let mut model = loaded(create_editor_model(), "A");
    let png = ClipboardItem::new("image/png", vec![1]);
    let mut clipboard = StubClipboard::slot(None, Some(png));
    App::handle_message_side_effects(&mut model, &mut workers, &mut clipboard, &Message::Paste(None));

    let model = update(model, Message::OpenPrompt(PromptKind::OpenId));
    let model = update(model, Message::PromptInput("43".to_string()));
    let model = update(model, Message::PromptSubmit);
    let model = loaded(model, "B");

    let event = workers.recv_timeout(WAIT).unwrap();
    assert!(matches!(&event, WorkerEvent::ImageUploaded { id, .. } if id.as_str() == "42"));
    let model = update(model, Message::Worker(event));
    assert_eq!(editor_text(&model), "B");
}

#[test]
fn test_broken_clipboard_still_pastes_terminal_text() {
    let (mut workers, _) = start_workers(FakeService::new());
    let mut model = loaded(create_editor_model(), "");
    let mut clipboard = StubClipboard::broken();
    App::handle_message_side_effects(
        &mut model,
        &mut workers,
        &mut clipboard,
        &Message::Paste(Some("typed".to_string())),
    );
    assert_eq!(editor_text(&model), "typed");
}

#[test]
fn test_broken_clipboard_ctrl_v_shows_error() {
    let (mut workers, _) = start_workers(FakeService::new());
    let mut model = loaded(create_editor_model(), "");
    let mut clipboard = StubClipboard::broken();
    App::handle_message_side_effects(&mut model, &mut workers, &mut clipboard, &Message::Paste(None));
    let (message, level) = model.active_toast().unwrap();
    assert_eq!(level, ToastLevel::Error);
    assert!(message.starts_with("Paste failed"));
}

#[test]
fn test_mount_load_runs_through_worker() {
    let (mut workers, _) = start_workers(FakeService::new().with_content(ContentPayload {
        html: Some("<p>Hi</p>".to_string()),
        mdx: None,
    }));
    let mut model = create_editor_model();
    let mut clipboard: ClipboardSlot = None;
    App::handle_message_side_effects(&mut model, &mut workers, &mut clipboard, &Message::Redraw);
    assert!(model.pending_load.is_none());

    let event = workers.recv_timeout(WAIT).unwrap();
    let model = update(model, Message::Worker(event));
    assert_eq!(editor_text(&model), "Hi");
    assert_eq!(model.load_state(), LoadState::Loaded);
}

#[test]
fn test_viewer_mount_fetches_rendered_text() {
    let (mut workers, _) = start_workers(FakeService::new().with_rendered("# Hi"));
    let mut model = create_viewer_model();
    let mut clipboard: ClipboardSlot = None;
    App::handle_message_side_effects(&mut model, &mut workers, &mut clipboard, &Message::Redraw);

    let event = workers.recv_timeout(WAIT).unwrap();
    let model = update(model, Message::Worker(event));
    assert_eq!(model.document.source(), "# Hi");
}

#[test]
fn test_save_posts_form_through_worker() {
    let (mut workers, service) = start_workers(FakeService::new());
    let model = type_text(loaded(create_editor_model(), ""), "# Hi");
    let mut model = update(model, Message::EditorSave);
    let mut clipboard: ClipboardSlot = None;
    App::handle_message_side_effects(&mut model, &mut workers, &mut clipboard, &Message::EditorSave);

    let event = workers.recv_timeout(WAIT).unwrap();
    let model = update(model, Message::Worker(event));
    assert!(!model.editor_is_dirty());
    assert_eq!(
        service.updates(),
        [("42".to_string(), "# Hi".to_string())]
    );
}

#[test]
fn test_finish_saves_waits_for_in_flight_save() {
    let (mut workers, service) = start_workers(FakeService::new());
    let model = type_text(loaded(create_editor_model(), ""), "bye");
    let mut model = update(model, Message::EditorSave);
    App::dispatch_pending_work(&mut model, &mut workers);
    App::finish_saves(&mut model, &mut workers, WAIT);
    assert!(!model.save_in_flight());
    assert!(!model.editor_is_dirty());
    assert_eq!(service.updates().len(), 1);
}
