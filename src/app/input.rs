use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;

use crate::app::{App, Message, Mode, Model, PromptKind};
use crate::editor::{Direction, Emphasis, ListKind};

use super::event_loop::ResizeDebouncer;

/// Spaces inserted for Tab in the editor.
const TAB_TEXT: &str = "    ";

impl App {
    pub(super) fn handle_event(
        event: &Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(*key, model),
            Event::Paste(text) if model.mode == Mode::Edit && model.prompt.is_none() => {
                Some(Message::Paste(Some(text.clone())))
            }
            Event::Resize(w, h) => {
                tracing::trace!(width = w, height = h, "resize queued");
                resize_debouncer.queue(*w, *h, now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        if let Some(prompt) = model.prompt.as_ref() {
            return Self::handle_prompt_key(key, &prompt.input);
        }
        match model.mode {
            Mode::Edit => Self::handle_editor_key(key),
            Mode::View => Self::handle_viewer_key(key, model),
        }
    }

    fn handle_prompt_key(key: KeyEvent, input: &str) -> Option<Message> {
        match key.code {
            KeyCode::Esc => Some(Message::PromptCancel),
            KeyCode::Enter => Some(Message::PromptSubmit),
            KeyCode::Backspace => {
                let mut next = input.to_string();
                next.pop();
                Some(Message::PromptInput(next))
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Message::PromptCancel)
            }
            KeyCode::Char(c)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                let mut next = input.to_string();
                next.push(c);
                Some(Message::PromptInput(next))
            }
            _ => None,
        }
    }

    fn handle_editor_key(key: KeyEvent) -> Option<Message> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl {
            return match key.code {
                KeyCode::Char('s') => Some(Message::EditorSave),
                KeyCode::Char('q') => Some(Message::Quit),
                KeyCode::Char('v') => Some(Message::Paste(None)),
                KeyCode::Char('p') => Some(Message::TogglePreview),
                KeyCode::Char('o') => Some(Message::OpenPrompt(PromptKind::OpenId)),
                // Toolbar
                KeyCode::Char('z') => Some(Message::EditorUndo),
                KeyCode::Char('y') => Some(Message::EditorRedo),
                KeyCode::Char('b') => Some(Message::EditorToggleEmphasis(Emphasis::Bold)),
                KeyCode::Char('e') => Some(Message::EditorToggleEmphasis(Emphasis::Italic)),
                KeyCode::Char('u') => Some(Message::EditorToggleEmphasis(Emphasis::Underline)),
                KeyCode::Char('k') => Some(Message::OpenPrompt(PromptKind::LinkUrl)),
                KeyCode::Char('l') => Some(Message::EditorToggleList(ListKind::Bullet)),
                KeyCode::Char('n') => Some(Message::EditorToggleList(ListKind::Numbered)),
                KeyCode::Char('g') => Some(Message::OpenPrompt(PromptKind::ImagePath)),
                KeyCode::Char('t') => Some(Message::EditorInsertTable),
                KeyCode::Left => Some(Message::EditorMoveWordLeft),
                KeyCode::Right => Some(Message::EditorMoveWordRight),
                KeyCode::Home => Some(Message::EditorMoveToStart),
                KeyCode::End => Some(Message::EditorMoveToEnd),
                _ => None,
            };
        }
        match key.code {
            KeyCode::Up => Some(Message::EditorMoveCursor(Direction::Up)),
            KeyCode::Down => Some(Message::EditorMoveCursor(Direction::Down)),
            KeyCode::Left => Some(Message::EditorMoveCursor(Direction::Left)),
            KeyCode::Right => Some(Message::EditorMoveCursor(Direction::Right)),
            KeyCode::Home => Some(Message::EditorMoveHome),
            KeyCode::End => Some(Message::EditorMoveEnd),
            KeyCode::PageUp => Some(Message::EditorPageUp),
            KeyCode::PageDown => Some(Message::EditorPageDown),
            KeyCode::Enter => Some(Message::EditorSplitLine),
            KeyCode::Backspace => Some(Message::EditorDeleteBack),
            KeyCode::Delete => Some(Message::EditorDeleteForward),
            KeyCode::Tab => Some(Message::EditorInsertText(TAB_TEXT.to_string())),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(Message::EditorInsertChar(c))
            }
            _ => None,
        }
    }

    fn handle_viewer_key(key: KeyEvent, model: &Model) -> Option<Message> {
        match key.code {
            // Navigation
            KeyCode::Char('j') | KeyCode::Down => {
                if model.viewport.can_scroll_down() {
                    Some(Message::ScrollDown(1))
                } else {
                    None
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if model.viewport.can_scroll_up() {
                    Some(Message::ScrollUp(1))
                } else {
                    None
                }
            }
            KeyCode::Char(' ') | KeyCode::PageDown => {
                if model.viewport.can_scroll_down() {
                    Some(Message::PageDown)
                } else {
                    None
                }
            }
            KeyCode::Char('b') | KeyCode::PageUp => {
                if model.viewport.can_scroll_up() {
                    Some(Message::PageUp)
                } else {
                    None
                }
            }
            KeyCode::Char('g') | KeyCode::Home => Some(Message::GoToTop),
            KeyCode::Char('G') | KeyCode::End => Some(Message::GoToBottom),

            KeyCode::Char('r') => Some(Message::Reload),
            KeyCode::Char('o') => Some(Message::OpenPrompt(PromptKind::OpenId)),

            // Quit
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Message::Quit)
            }

            _ => None,
        }
    }

    pub(super) fn view(model: &mut Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }
}
