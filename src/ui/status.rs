use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Mode, Model, PromptKind, ToastLevel};
use crate::editor::EditorBuffer;
use crate::loader::LoadState;

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let (text, style) = match model.mode {
        Mode::Edit => (
            editor_status(model),
            Style::default().bg(Color::Magenta).fg(Color::White),
        ),
        Mode::View => (
            viewer_status(model),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn content_label(model: &Model) -> String {
    let id = model
        .content_id
        .as_ref()
        .map_or_else(|| "(none)".to_string(), ToString::to_string);
    if model.load_state() == LoadState::Loading {
        format!("{id} [loading]")
    } else {
        id
    }
}

fn editor_status(model: &Model) -> String {
    let dirty = model
        .editor_buffer
        .as_ref()
        .is_some_and(EditorBuffer::is_dirty);
    let dirty_indicator = if dirty { " [modified]" } else { "" };
    let saving_indicator = if model.save_in_flight() {
        " [saving]"
    } else {
        ""
    };
    let cursor_info = model.editor_buffer.as_ref().map_or_else(String::new, |b| {
        format!(
            "  Ln {}, Col {}",
            b.cursor().line + 1,
            b.cursor_display_col() + 1
        )
    });
    format!(
        " EDIT  {}{dirty_indicator}{saving_indicator}{cursor_info}  ^S:save ^V:paste ^P:preview ^O:open ^Q:quit",
        content_label(model)
    )
}

fn viewer_status(model: &Model) -> String {
    let line_info = format!(
        "Line {}/{}",
        (model.viewport.offset() + 1).min(model.viewport.total_lines().max(1)),
        model.viewport.total_lines()
    );
    format!(
        " VIEW  {}  [{}%]  {line_info}  r:reload o:open q:quit",
        content_label(model),
        model.viewport.scroll_percent()
    )
}

pub fn render_prompt_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(prompt) = model.prompt.as_ref() else {
        return;
    };
    let action = match prompt.kind {
        PromptKind::OpenId => "open",
        PromptKind::LinkUrl => "link",
        PromptKind::ImagePath => "upload",
    };
    let bar = Paragraph::new(format!(
        "{}: {}_  Enter: {action}  Esc: cancel",
        prompt.kind.label(),
        prompt.input
    ))
        .style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_widget(bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
