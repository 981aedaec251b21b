use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::app::Model;

use super::style::{cursor_style, gutter_style, style_for_inline, style_for_line_type};
use super::{DOCUMENT_LEFT_PADDING, EDITOR_WIDTH_PERCENT, PREVIEW_WIDTH_PERCENT, status};

/// Editor text on the left, rendered preview on the right.
pub fn split_editor_columns(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(EDITOR_WIDTH_PERCENT),
            Constraint::Percentage(PREVIEW_WIDTH_PERCENT),
        ])
        .split(area)
}

/// Columns available to rendered markdown for a terminal `total_width`
/// wide, with or without the editor beside it.
pub fn document_content_width(total_width: u16, with_editor: bool) -> u16 {
    let area = Rect::new(0, 0, total_width, 1);
    let doc_width = if with_editor {
        split_editor_columns(area)[1].width
    } else {
        total_width
    };
    doc_width.saturating_sub(DOCUMENT_LEFT_PADDING).max(1)
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();

    let toast_active = model.active_toast().is_some();
    let prompt_active = model.prompt.is_some();
    let footer_rows = 1 + u16::from(toast_active) + u16::from(prompt_active);
    // Footer from the bottom: status bar, prompt, toast.
    let body_area = Rect {
        height: area.height.saturating_sub(footer_rows),
        ..area
    };
    let toast_area = Rect {
        y: area.y + area.height.saturating_sub(footer_rows),
        height: 1,
        ..area
    };
    let prompt_area = Rect {
        y: area.y + area.height.saturating_sub(1 + u16::from(prompt_active)),
        height: 1,
        ..area
    };
    let status_area = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: 1,
        ..area
    };

    frame.render_widget(Clear, body_area);
    if model.shows_preview() {
        let columns = split_editor_columns(body_area);
        render_editor(model, frame, columns[0]);
        render_document(model, frame, columns[1], true);
    } else if model.editor_buffer.is_some() {
        render_editor(model, frame, body_area);
    } else {
        render_document(model, frame, body_area, false);
    }

    if toast_active {
        status::render_toast_bar(model, frame, toast_area);
    }
    if prompt_active {
        status::render_prompt_bar(model, frame, prompt_area);
    }
    status::render_status_bar(model, frame, status_area);
}

fn render_document(model: &Model, frame: &mut Frame, area: Rect, beside_editor: bool) {
    let rows = usize::from(model.viewport.height().min(area.height));
    let content: Vec<Line> = model
        .document
        .visible_lines(model.viewport.offset(), rows)
        .map(|line| {
            let line_style = style_for_line_type(line.line_type());
            match line.spans() {
                Some(spans) => Line::from(
                    spans
                        .iter()
                        .map(|span| {
                            Span::styled(
                                span.text().to_string(),
                                style_for_inline(line_style, span.style()),
                            )
                        })
                        .collect::<Vec<_>>(),
                ),
                None => Line::styled(line.content().to_string(), line_style),
            }
        })
        .collect();

    // Beside the editor, one padding column becomes the divider.
    let doc_block = if beside_editor {
        Block::default()
            .borders(Borders::LEFT)
            .border_style(gutter_style())
            .padding(Padding::left(DOCUMENT_LEFT_PADDING - 1))
    } else {
        Block::default()
            .borders(Borders::NONE)
            .padding(Padding::left(DOCUMENT_LEFT_PADDING))
    };
    frame.render_widget(Paragraph::new(content).block(doc_block), area);
}

fn render_editor(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(buf) = &model.editor_buffer else {
        return;
    };

    let total_lines = buf.line_count();
    let gutter_width = line_number_width(total_lines) + 1;
    let gutter_area = Rect {
        width: gutter_width.min(area.width),
        ..area
    };
    let text_area = Rect {
        x: area.x + gutter_area.width,
        width: area.width.saturating_sub(gutter_area.width),
        ..area
    };

    let start = model.editor_viewport.offset();
    let end = (start + usize::from(area.height)).min(total_lines);
    let cursor = buf.cursor();

    let mut numbers: Vec<Line> = Vec::new();
    let mut content: Vec<Line> = Vec::new();
    for line_idx in start..end {
        let line_text = buf.line_at(line_idx).unwrap_or_default();
        numbers.push(Line::styled(
            format!(
                "{:>width$} ",
                line_idx + 1,
                width = usize::from(gutter_width - 1)
            ),
            gutter_style(),
        ));

        if line_idx != cursor.line {
            content.push(Line::raw(line_text));
            continue;
        }
        // Split the cursor line around the character under the cursor.
        let before = line_text.get(..cursor.col).unwrap_or(line_text.as_str());
        let mut rest = line_text[before.len()..].chars();
        let under = rest.next().map_or_else(|| " ".to_string(), String::from);
        let after = rest.as_str();

        let mut spans = Vec::new();
        if !before.is_empty() {
            spans.push(Span::raw(before.to_string()));
        }
        spans.push(Span::styled(under, cursor_style()));
        if !after.is_empty() {
            spans.push(Span::raw(after.to_string()));
        }
        content.push(Line::from(spans));
    }

    // Scroll sideways so the cursor stays inside the text column.
    let text_width = usize::from(text_area.width.max(1));
    let hscroll = (buf.cursor_display_col() + 1).saturating_sub(text_width);
    let hscroll = u16::try_from(hscroll).unwrap_or(u16::MAX);

    frame.render_widget(Paragraph::new(numbers), gutter_area);
    frame.render_widget(Paragraph::new(content).scroll((0, hscroll)), text_area);
}

/// Calculate the width needed for line numbers.
pub const fn line_number_width(total_lines: usize) -> u16 {
    if total_lines < 10 {
        1
    } else if total_lines < 100 {
        2
    } else if total_lines < 1_000 {
        3
    } else if total_lines < 10_000 {
        4
    } else if total_lines < 100_000 {
        5
    } else {
        6
    }
}
