//! Legacy HTML to markdown conversion.
//!
//! Older webparts were authored as rich HTML. Before such content reaches the
//! editor it is parsed with html5ever and rewritten as markdown, element by
//! element. The output follows the common converter defaults: setext
//! headings for the top two levels, `_` emphasis, `**` strong, `*` bullets
//! and indented code blocks.

mod escape;
mod rules;

pub use escape::escape_markdown;

use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::RcDom;

/// How `<h1>`..`<h6>` are written.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeadingStyle {
    /// Underlined `===`/`---` for levels one and two, `#` prefixes below.
    #[default]
    Setext,
    /// `#` prefixes at every level.
    Atx,
}

/// How `<pre>` blocks are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeBlockStyle {
    /// Four-space indented block.
    #[default]
    Indented,
    /// Backtick fence carrying the `language-*` class, if any.
    Fenced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub heading_style: HeadingStyle,
    pub code_block_style: CodeBlockStyle,
    pub bullet_marker: char,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Setext,
            code_block_style: CodeBlockStyle::Indented,
            bullet_marker: '*',
        }
    }
}

/// Converts HTML documents or fragments to markdown.
///
/// Conversion is total: html5ever recovers from any malformed input, so
/// every string produces some markdown.
#[derive(Debug, Clone, Default)]
pub struct HtmlConverter {
    options: ConvertOptions,
}

impl HtmlConverter {
    pub const fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub const fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn convert(&self, html: &str) -> String {
        let dom = html5ever::parse_document(RcDom::default(), Default::default()).one(html);
        rules::Walker::new(&self.options).run(&dom.document)
    }
}

/// Convert `html` with the default options.
pub fn html_to_markdown(html: &str) -> String {
    HtmlConverter::default().convert(html)
}
