//! Markdown layout with comrak.

use comrak::nodes::{AstNode, ListDelimType, ListType, NodeList, NodeValue, TableAlignment};
use comrak::{Arena, Options, parse_document};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::types::{Document, InlineSpan, InlineStyle, LineType, RenderedLine};

const CODE_RIGHT_PADDING: usize = 3;

impl Document {
    /// Render markdown source wrapped to `width` columns.
    ///
    /// # Example
    ///
    /// ```
    /// use webpart::document::Document;
    ///
    /// let doc = Document::parse_with_layout("# Hello\n\nWorld", 80);
    /// assert_eq!(doc.line_at(0).map(|l| l.content()), Some("# Hello"));
    /// ```
    pub fn parse_with_layout(source: &str, width: u16) -> Self {
        parse_with_layout(source, width)
    }
}

/// Render markdown source into display lines wrapped to `width` columns.
///
/// The result depends only on `source` and `width`.
pub fn parse_with_layout(source: &str, width: u16) -> Document {
    let arena = Arena::new();
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    let root = parse_document(&arena, source, &options);

    let mut layout = Layout::new(usize::from(width.max(1)));
    layout.block(root, 0);
    while layout
        .lines
        .last()
        .is_some_and(|line| *line.line_type() == LineType::Empty)
    {
        layout.lines.pop();
    }
    Document::from_lines(source.to_string(), width, layout.lines)
}

struct Layout {
    width: usize,
    lines: Vec<RenderedLine>,
}

impl Layout {
    const fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
        }
    }

    fn block<'a>(&mut self, node: &'a AstNode<'a>, depth: usize) {
        match &node.data.borrow().value {
            NodeValue::Heading(heading) => {
                let prefix = format!("{} ", "#".repeat(usize::from(heading.level)));
                let continuation = " ".repeat(prefix.len());
                let spans = inline_spans(node);
                self.push_wrapped(&spans, LineType::Heading(heading.level), &prefix, &continuation);
                self.blank();
            }
            NodeValue::Paragraph => {
                if let Some(images) = standalone_images(node) {
                    for (alt, src) in images {
                        self.lines
                            .push(RenderedLine::new(image_label(&alt, &src), LineType::Image));
                    }
                } else {
                    let spans = inline_spans(node);
                    self.push_wrapped(&spans, LineType::Paragraph, "", "");
                }
                self.blank();
            }
            NodeValue::CodeBlock(code) => {
                self.code_block(&code.info, &code.literal);
                self.blank();
            }
            NodeValue::HtmlBlock(html) => {
                for raw in html.literal.lines() {
                    self.lines
                        .push(RenderedLine::new(raw.trim_end().to_string(), LineType::Html));
                }
                self.blank();
            }
            NodeValue::List(list) => {
                self.list(node, list, depth);
                if depth == 0 {
                    self.blank();
                }
            }
            NodeValue::BlockQuote => {
                self.quote(node, 1);
                self.blank();
            }
            NodeValue::ThematicBreak => {
                self.lines.push(RenderedLine::new(
                    "─".repeat(self.width),
                    LineType::HorizontalRule,
                ));
                self.blank();
            }
            NodeValue::Table(_) => {
                for row in render_table(node, self.width) {
                    self.lines.push(RenderedLine::new(row, LineType::Table));
                }
                self.blank();
            }
            _ => {
                for child in node.children() {
                    self.block(child, depth);
                }
            }
        }
    }

    fn list<'a>(&mut self, node: &'a AstNode<'a>, list: &NodeList, depth: usize) {
        let delimiter = match list.delimiter {
            ListDelimType::Paren => ')',
            ListDelimType::Period => '.',
        };
        let count = node.children().count();
        let number_width = (list.start + count.saturating_sub(1)).to_string().len();
        for (index, child) in node.children().enumerate() {
            let marker = match list.list_type {
                ListType::Bullet => "•".to_string(),
                ListType::Ordered => {
                    format!("{:>number_width$}{delimiter}", list.start + index)
                }
            };
            self.item(child, depth + 1, &marker);
        }
    }

    fn item<'a>(&mut self, node: &'a AstNode<'a>, depth: usize, list_marker: &str) {
        let marker = match &node.data.borrow().value {
            NodeValue::TaskItem(Some(_)) => "✓",
            NodeValue::TaskItem(None) => "□",
            _ => list_marker,
        };
        let indent = "  ".repeat(depth.saturating_sub(1));
        let first = format!("{indent}{marker} ");
        let next = format!("{indent}{}", " ".repeat(marker.width() + 1));
        let line_type = LineType::ListItem(depth);
        let mut paragraphs = 0usize;

        for child in node.children() {
            match &child.data.borrow().value {
                NodeValue::Paragraph => {
                    if paragraphs > 0 {
                        self.lines.push(RenderedLine::new(String::new(), line_type));
                    }
                    let prefix = if paragraphs == 0 { &first } else { &next };
                    let spans = inline_spans(child);
                    self.push_wrapped(&spans, line_type, prefix, &next);
                    paragraphs += 1;
                }
                NodeValue::List(list) => {
                    if paragraphs == 0 {
                        self.lines.push(RenderedLine::new(first.clone(), line_type));
                        paragraphs += 1;
                    }
                    self.list(child, list, depth);
                }
                _ => self.block(child, depth),
            }
        }

        if paragraphs == 0 {
            self.lines
                .push(RenderedLine::new(first.trim_end().to_string(), line_type));
        }
    }

    fn quote<'a>(&mut self, node: &'a AstNode<'a>, quote_depth: usize) {
        let prefix = format!("  {}", "│ ".repeat(quote_depth));
        for child in node.children() {
            match &child.data.borrow().value {
                NodeValue::Paragraph => {
                    let spans = inline_spans(child);
                    self.push_wrapped(&spans, LineType::BlockQuote, &prefix, &prefix);
                }
                NodeValue::BlockQuote => self.quote(child, quote_depth + 1),
                _ => {
                    for raw in extract_text(child).lines() {
                        let spans = [InlineSpan::plain(raw)];
                        self.push_wrapped(&spans, LineType::BlockQuote, &prefix, &prefix);
                    }
                }
            }
        }
    }

    fn code_block(&mut self, info: &str, literal: &str) {
        let raw_lines = literal
            .lines()
            .map(|line| line.replace('\t', "    "))
            .collect::<Vec<_>>();
        let content_width = raw_lines
            .iter()
            .map(|line| display_width(line))
            .max()
            .unwrap_or(0)
            .min(self.width.saturating_sub(4 + CODE_RIGHT_PADDING).max(1));
        let inner_width = content_width + 2 + CODE_RIGHT_PADDING;

        let title = info.split_whitespace().next().unwrap_or("code");
        let label = truncate_text(&format!(" {title} "), inner_width);
        let fill = "─".repeat(inner_width - display_width(&label));
        self.lines
            .push(RenderedLine::new(format!("┌{label}{fill}┐"), LineType::CodeBlock));

        let code_style = InlineStyle {
            code: true,
            ..InlineStyle::default()
        };
        for raw in &raw_lines {
            let text = truncate_text(raw, content_width);
            let padding =
                " ".repeat(content_width - display_width(&text) + CODE_RIGHT_PADDING);
            let spans = vec![
                InlineSpan::plain("│ "),
                InlineSpan::new(text, code_style),
                InlineSpan::plain(format!("{padding} │")),
            ];
            self.lines
                .push(RenderedLine::from_spans(LineType::CodeBlock, spans));
        }

        self.lines.push(RenderedLine::new(
            format!("└{}┘", "─".repeat(inner_width)),
            LineType::CodeBlock,
        ));
    }

    fn push_wrapped(
        &mut self,
        spans: &[InlineSpan],
        line_type: LineType,
        prefix_first: &str,
        prefix_next: &str,
    ) {
        for line in wrap_spans(spans, self.width, prefix_first, prefix_next) {
            self.lines.push(RenderedLine::from_spans(line_type, line));
        }
    }

    fn blank(&mut self) {
        if self
            .lines
            .last()
            .is_some_and(|line| *line.line_type() != LineType::Empty)
        {
            self.lines
                .push(RenderedLine::new(String::new(), LineType::Empty));
        }
    }
}

fn image_label(alt: &str, src: &str) -> String {
    format!("[Image: {}]", if alt.is_empty() { src } else { alt })
}

/// The images of a paragraph that holds nothing but images.
fn standalone_images<'a>(node: &'a AstNode<'a>) -> Option<Vec<(String, String)>> {
    let mut images = Vec::new();
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Image(link) => images.push((extract_text(child), link.url.clone())),
            NodeValue::SoftBreak | NodeValue::LineBreak => {}
            NodeValue::Text(text) if text.trim().is_empty() => {}
            _ => return None,
        }
    }
    (!images.is_empty()).then_some(images)
}

fn extract_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    extract_text_recursive(node, &mut text);
    text
}

fn extract_text_recursive<'a>(node: &'a AstNode<'a>, text: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(t) | NodeValue::HtmlInline(t) => text.push_str(t),
        NodeValue::Code(code) => text.push_str(&code.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
        _ => {
            for child in node.children() {
                extract_text_recursive(child, text);
            }
        }
    }
}

fn inline_spans<'a>(node: &'a AstNode<'a>) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    collect_inline_spans(node, InlineStyle::default(), &mut spans);
    spans
}

fn collect_inline_spans<'a>(node: &'a AstNode<'a>, style: InlineStyle, spans: &mut Vec<InlineSpan>) {
    let mut nested = style;
    match &node.data.borrow().value {
        NodeValue::List(_) | NodeValue::Item(_) => return,
        NodeValue::Text(t) | NodeValue::HtmlInline(t) => {
            spans.push(InlineSpan::new(t.clone(), style));
            return;
        }
        NodeValue::Code(code) => {
            let code_style = InlineStyle {
                code: true,
                link: style.link,
                ..InlineStyle::default()
            };
            spans.push(InlineSpan::new(code.literal.clone(), code_style));
            return;
        }
        NodeValue::Image(image) => {
            let alt = extract_text(node);
            let link_style = InlineStyle {
                link: true,
                ..style
            };
            spans.push(InlineSpan::new(image_label(&alt, &image.url), link_style));
            return;
        }
        NodeValue::SoftBreak => {
            spans.push(InlineSpan::new(" ".to_string(), style));
            return;
        }
        NodeValue::LineBreak => {
            spans.push(InlineSpan::new("\n".to_string(), style));
            return;
        }
        NodeValue::Emph => nested.emphasis = true,
        NodeValue::Strong => nested.strong = true,
        NodeValue::Strikethrough => nested.strikethrough = true,
        NodeValue::Link(_) => nested.link = true,
        _ => {}
    }
    for child in node.children() {
        collect_inline_spans(child, nested, spans);
    }
}

struct WrapLine {
    spans: Vec<InlineSpan>,
    width: usize,
    has_word: bool,
}

impl WrapLine {
    fn start(prefix: &str) -> Self {
        let spans = if prefix.is_empty() {
            Vec::new()
        } else {
            vec![InlineSpan::plain(prefix)]
        };
        Self {
            spans,
            width: prefix.width(),
            has_word: false,
        }
    }

    fn push(&mut self, token: InlineSpan, width: usize, is_ws: bool) {
        self.width += width;
        self.spans.push(token);
        self.has_word |= !is_ws;
    }

    fn finish(mut self) -> Vec<InlineSpan> {
        while self.has_word && self.spans.last().is_some_and(|span| is_blank(span.text())) {
            self.spans.pop();
        }
        self.spans
    }
}

fn wrap_spans(
    spans: &[InlineSpan],
    width: usize,
    prefix_first: &str,
    prefix_next: &str,
) -> Vec<Vec<InlineSpan>> {
    let mut lines = Vec::new();
    let mut line = WrapLine::start(prefix_first);

    for token in spans.iter().flat_map(split_inline_tokens) {
        if token.text() == "\n" {
            lines.push(line.finish());
            line = WrapLine::start(prefix_next);
            continue;
        }
        let is_ws = is_blank(token.text());
        let token_width = token.text().width();
        if !is_ws && line.has_word && line.width + token_width > width {
            lines.push(line.finish());
            line = WrapLine::start(prefix_next);
        }
        // Whitespace never starts a line.
        if is_ws && !line.has_word {
            continue;
        }
        line.push(token, token_width, is_ws);
    }

    lines.push(line.finish());
    lines
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Split a span into alternating word and whitespace runs; `\n` stands alone.
fn split_inline_tokens(span: &InlineSpan) -> Vec<InlineSpan> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut ws_state: Option<bool> = None;

    for ch in span.text().chars() {
        if ch == '\n' {
            if !buf.is_empty() {
                out.push(InlineSpan::new(std::mem::take(&mut buf), span.style()));
            }
            out.push(InlineSpan::new("\n".to_string(), span.style()));
            ws_state = None;
            continue;
        }
        let is_ws = ch.is_whitespace();
        if ws_state.is_some_and(|state| state != is_ws) {
            out.push(InlineSpan::new(std::mem::take(&mut buf), span.style()));
        }
        buf.push(ch);
        ws_state = Some(is_ws);
    }

    if !buf.is_empty() {
        out.push(InlineSpan::new(buf, span.style()));
    }
    out
}

fn render_table<'a>(table_node: &'a AstNode<'a>, wrap_width: usize) -> Vec<String> {
    let (alignments, mut rows, has_header) = collect_table_rows(table_node);
    let num_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if num_cols == 0 {
        return Vec::new();
    }
    for row in &mut rows {
        row.resize(num_cols, String::new());
    }

    let mut col_widths = vec![1_usize; num_cols];
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            col_widths[idx] = col_widths[idx].max(display_width(cell));
        }
    }

    // A row is 1 + sum(width + 3) columns wide.
    let max_table_width = wrap_width.max(4);
    while 1 + col_widths.iter().sum::<usize>() + 3 * num_cols > max_table_width {
        let Some((widest, width)) = col_widths
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|&(idx, width)| (width, std::cmp::Reverse(idx)))
        else {
            break;
        };
        if width <= 1 {
            break;
        }
        col_widths[widest] -= 1;
    }

    let mut lines = vec![render_table_border(&col_widths, '┌', '┬', '┐')];
    for (idx, row) in rows.iter().enumerate() {
        lines.push(render_table_row(row, &col_widths, &alignments));
        if has_header && idx == 0 {
            lines.push(render_table_border(&col_widths, '├', '┼', '┤'));
        }
    }
    lines.push(render_table_border(&col_widths, '└', '┴', '┘'));
    lines
}

fn collect_table_rows<'a>(
    table_node: &'a AstNode<'a>,
) -> (Vec<TableAlignment>, Vec<Vec<String>>, bool) {
    let alignments = match &table_node.data.borrow().value {
        NodeValue::Table(table) => table.alignments.clone(),
        _ => Vec::new(),
    };

    let mut rows = Vec::new();
    let mut has_header = false;
    for row_node in table_node.children() {
        match row_node.data.borrow().value {
            NodeValue::TableRow(header) => has_header |= header,
            _ => continue,
        }
        let cells = row_node
            .children()
            .filter(|cell| matches!(cell.data.borrow().value, NodeValue::TableCell))
            .map(|cell| {
                extract_text(cell)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        rows.push(cells);
    }
    (alignments, rows, has_header)
}

fn render_table_border(widths: &[usize], left: char, middle: char, right: char) -> String {
    let segments = widths
        .iter()
        .map(|width| "─".repeat(width + 2))
        .collect::<Vec<_>>();
    format!("{left}{}{right}", segments.join(&middle.to_string()))
}

fn render_table_row(cells: &[String], widths: &[usize], alignments: &[TableAlignment]) -> String {
    let mut out = String::from("│");
    for (idx, width) in widths.iter().enumerate() {
        let content = truncate_text(cells.get(idx).map_or("", String::as_str), *width);
        let padding = width.saturating_sub(display_width(&content));
        let (left, right) = match alignments.get(idx).copied().unwrap_or(TableAlignment::None) {
            TableAlignment::Right => (padding, 0),
            TableAlignment::Center => (padding / 2, padding - padding / 2),
            TableAlignment::Left | TableAlignment::None => (0, padding),
        };
        out.push(' ');
        out.push_str(&" ".repeat(left));
        out.push_str(&content);
        out.push_str(&" ".repeat(right));
        out.push_str(" │");
    }
    out
}

fn truncate_text(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out
}

fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}
