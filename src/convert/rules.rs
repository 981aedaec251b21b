//! Per-element markdown replacements over an html5ever DOM.

use markup5ever_rcdom::{Handle, NodeData};

use super::escape::{clean_attribute, collapse_whitespace, escape_markdown};
use super::{CodeBlockStyle, ConvertOptions, HeadingStyle};

/// Elements that introduce a block boundary when no specific rule applies.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "body", "canvas", "center", "dd", "dir", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "header", "hgroup", "html",
    "main", "menu", "nav", "noscript", "output", "section", "table", "tbody", "td", "tfoot",
    "th", "thead", "tr", "video",
];

/// Elements whose content never reaches the output.
const DROPPED_ELEMENTS: &[&str] = &["head", "script", "style", "template", "title"];

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    /// Inside `<code>`: text is not escaped.
    code: bool,
    /// Directly building a list item's content.
    list_item: bool,
}

pub struct Walker<'a> {
    options: &'a ConvertOptions,
}

impl<'a> Walker<'a> {
    pub const fn new(options: &'a ConvertOptions) -> Self {
        Self { options }
    }

    /// Markdown for everything below `root`, with surrounding blank lines
    /// and trailing whitespace removed.
    pub fn run(&self, root: &Handle) -> String {
        let output = self.children(root, Context::default());
        output
            .trim_start_matches(['\n', '\r', '\t'])
            .trim_end()
            .to_string()
    }

    fn children(&self, node: &Handle, ctx: Context) -> String {
        let mut output = String::new();
        for child in node.children.borrow().iter() {
            let replacement = match &child.data {
                NodeData::Text { contents } => text(&contents.borrow(), ctx),
                NodeData::Element { .. } => self.element(child, ctx),
                _ => continue,
            };
            output = join(&output, &replacement);
        }
        output
    }

    fn element(&self, node: &Handle, ctx: Context) -> String {
        let Some(tag) = tag_name(node) else {
            return String::new();
        };
        let inner = Context {
            list_item: false,
            ..ctx
        };
        match tag.as_str() {
            name if DROPPED_ELEMENTS.contains(&name) => String::new(),
            "p" => block(&self.children(node, inner)),
            "br" => "  \n".to_string(),
            "hr" => "\n\n* * *\n\n".to_string(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                self.heading(level, &self.children(node, inner))
            }
            "blockquote" => blockquote(&self.children(node, inner)),
            "ul" | "ol" => self.list(node, tag == "ol", ctx),
            "li" => self.list_item(node, &format!("{}   ", self.options.bullet_marker), inner),
            "pre" => self.code_block(node),
            "code" => inline_code(&self.children(
                node,
                Context {
                    code: true,
                    ..inner
                },
            )),
            "em" | "i" => wrap_inline(&self.children(node, inner), "_"),
            "strong" | "b" => wrap_inline(&self.children(node, inner), "**"),
            "del" | "s" | "strike" => wrap_inline(&self.children(node, inner), "~~"),
            "a" => link(node, &self.children(node, inner)),
            "img" => image(node),
            name if BLOCK_ELEMENTS.contains(&name) => block(&self.children(node, inner)),
            _ => self.children(node, inner),
        }
    }

    fn heading(&self, level: usize, content: &str) -> String {
        let content = content.trim();
        if content.is_empty() {
            return "\n\n".to_string();
        }
        match self.options.heading_style {
            HeadingStyle::Setext if level <= 2 => {
                let underline = if level == 1 { '=' } else { '-' };
                let width = content.chars().count();
                format!(
                    "\n\n{content}\n{}\n\n",
                    underline.to_string().repeat(width)
                )
            }
            _ => format!("\n\n{} {content}\n\n", "#".repeat(level)),
        }
    }

    fn list(&self, node: &Handle, ordered: bool, ctx: Context) -> String {
        let start = if ordered {
            attribute(node, "start")
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(1)
        } else {
            1
        };
        let bullet = format!("{}   ", self.options.bullet_marker);
        let inner = Context {
            list_item: false,
            ..ctx
        };

        let mut output = String::new();
        let mut index = 0;
        for child in node.children.borrow().iter() {
            let replacement = match &child.data {
                NodeData::Element { .. } if tag_name(child).as_deref() == Some("li") => {
                    let marker = if ordered {
                        format!("{}.  ", start + index)
                    } else {
                        bullet.clone()
                    };
                    index += 1;
                    self.list_item(child, &marker, inner)
                }
                NodeData::Element { .. } => self.element(child, inner),
                _ => continue,
            };
            output = join(&output, &replacement);
        }

        if ctx.list_item {
            format!("\n{output}")
        } else {
            format!("\n\n{output}\n\n")
        }
    }

    fn list_item(&self, node: &Handle, marker: &str, ctx: Context) -> String {
        let content = self.children(
            node,
            Context {
                list_item: true,
                ..ctx
            },
        );
        let content = trim_block_start(&content).trim_end();
        let indented = content
            .split('\n')
            .enumerate()
            .map(|(index, line)| {
                if index == 0 || line.is_empty() {
                    line.to_string()
                } else {
                    format!("    {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("{marker}{indented}\n")
    }

    fn code_block(&self, node: &Handle) -> String {
        let code_child = node
            .children
            .borrow()
            .iter()
            .find(|child| !is_blank_text(child))
            .filter(|child| tag_name(child).as_deref() == Some("code"))
            .cloned();
        let source = code_child.as_ref().unwrap_or(node);
        let code = text_content(source);
        let code = code.strip_suffix('\n').unwrap_or(&code);

        match self.options.code_block_style {
            CodeBlockStyle::Indented => {
                format!("\n\n    {}\n\n", code.replace('\n', "\n    "))
            }
            CodeBlockStyle::Fenced => {
                let language = code_child
                    .as_ref()
                    .and_then(|child| attribute(child, "class"))
                    .and_then(|class| {
                        class
                            .split_whitespace()
                            .find_map(|name| name.strip_prefix("language-"))
                            .map(ToOwned::to_owned)
                    })
                    .unwrap_or_default();
                let fence = "`".repeat(fence_size(code));
                format!("\n\n{fence}{language}\n{code}\n{fence}\n\n")
            }
        }
    }
}

fn text(raw: &str, ctx: Context) -> String {
    let collapsed = collapse_whitespace(raw);
    if ctx.code {
        collapsed
    } else {
        escape_markdown(&collapsed)
    }
}

/// Concatenate two pieces of output, merging the newlines at the seam.
///
/// The separator is the larger of the trailing newlines of `output` and the
/// leading newlines of `replacement`, capped at a blank line. A replacement
/// that opens a new block drops trailing spaces from `output`; inline text
/// that follows a line break drops its leading spaces. Spaces at the start
/// of a block are left for the block rule to trim.
fn join(output: &str, replacement: &str) -> String {
    let head = if replacement.starts_with('\n') {
        output.trim_end_matches([' ', '\n'])
    } else {
        output.trim_end_matches('\n')
    };
    let tail = replacement.trim_start_matches('\n');
    let trailing = output.len() - output.trim_end_matches('\n').len();
    let leading = replacement.len() - tail.len();
    let doubled_space = head.ends_with(' ') && !tail.trim_start_matches(' ').starts_with('\n');
    let tail = if (leading == 0 && output.ends_with('\n')) || doubled_space {
        tail.trim_start_matches(' ')
    } else {
        tail
    };
    let newlines = trailing.max(leading).min(2);
    let mut joined = String::with_capacity(head.len() + newlines + tail.len());
    joined.push_str(head);
    joined.push_str(&"\n".repeat(newlines));
    joined.push_str(tail);
    joined
}

/// Drop the blank lines before a block's content, or the spaces before its
/// first inline text. Indentation after a line break is kept.
fn trim_block_start(content: &str) -> &str {
    if content.starts_with('\n') {
        content.trim_start_matches('\n')
    } else {
        content.trim_start_matches(' ')
    }
}

fn block(content: &str) -> String {
    let content = trim_block_start(content).trim_end();
    if content.is_empty() {
        "\n\n".to_string()
    } else {
        format!("\n\n{content}\n\n")
    }
}

fn blockquote(content: &str) -> String {
    let content = trim_block_start(content).trim_end_matches('\n');
    if content.trim().is_empty() {
        return "\n\n".to_string();
    }
    let quoted = content
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n{quoted}\n\n")
}

/// Split `content` into its trimmed core and the single spaces that
/// flanked it.
fn flanking(content: &str) -> (&'static str, &str, &'static str) {
    let space = |present: bool| if present { " " } else { "" };
    (
        space(content.starts_with(char::is_whitespace)),
        content.trim(),
        space(content.ends_with(char::is_whitespace)),
    )
}

/// Wrap inline content in `delimiter`, moving flanking spaces outside.
fn wrap_inline(content: &str, delimiter: &str) -> String {
    let (leading, trimmed, trailing) = flanking(content);
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{leading}{delimiter}{trimmed}{delimiter}{trailing}")
}

fn inline_code(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    let content = content.replace(['\r', '\n'], " ");
    let runs = backtick_runs(&content);
    let mut size = 1;
    while runs.contains(&size) {
        size += 1;
    }
    let delimiter = "`".repeat(size);
    let padded = content.starts_with('`')
        || content.ends_with('`')
        || (content.starts_with(' ')
            && content.ends_with(' ')
            && content.chars().any(|c| c != ' '));
    let space = if padded { " " } else { "" };
    format!("{delimiter}{space}{content}{space}{delimiter}")
}

fn backtick_runs(text: &str) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    if current > 0 {
        runs.push(current);
    }
    runs
}

/// Fence length that cannot be closed by a backtick run inside `code`.
fn fence_size(code: &str) -> usize {
    code.lines()
        .map(|line| line.chars().take_while(|&c| c == '`').count())
        .filter(|&run| run >= 3)
        .map(|run| run + 1)
        .max()
        .unwrap_or(3)
}

fn link(node: &Handle, content: &str) -> String {
    let Some(href) = attribute(node, "href").filter(|href| !href.is_empty()) else {
        return content.to_string();
    };
    let href = href.replace('(', r"\(").replace(')', r"\)");
    let title = attribute(node, "title")
        .map(|title| clean_attribute(&title))
        .filter(|title| !title.is_empty())
        .map(|title| format!(" \"{}\"", title.replace('"', "\\\"")))
        .unwrap_or_default();
    let (leading, content, trailing) = flanking(content);
    format!("{leading}[{content}]({href}{title}){trailing}")
}

fn image(node: &Handle) -> String {
    let Some(src) = attribute(node, "src").filter(|src| !src.is_empty()) else {
        return String::new();
    };
    let alt = attribute(node, "alt")
        .map(|alt| clean_attribute(&alt))
        .unwrap_or_default();
    let title = attribute(node, "title")
        .map(|title| clean_attribute(&title))
        .filter(|title| !title.is_empty())
        .map(|title| format!(" \"{title}\""))
        .unwrap_or_default();
    format!("![{alt}]({src}{title})")
}

fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attribute(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == key)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn is_blank_text(node: &Handle) -> bool {
    match &node.data {
        NodeData::Text { contents } => contents.borrow().trim().is_empty(),
        _ => false,
    }
}

fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } if tag_name(node).as_deref() == Some("br") => out.push('\n'),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}
