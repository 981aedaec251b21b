//! Markdown escaping for text lifted out of HTML.

use std::sync::LazyLock;

use regex::Regex;

/// Escapes applied to every text node, in order. Anchored patterns only
/// match at the start of the node's text.
static ESCAPES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\\", r"\\"),
        (r"\*", r"\*"),
        (r"^-", r"\-"),
        (r"^\+ ", r"\+ "),
        (r"^(=+)", r"\${1}"),
        (r"^(#{1,6}) ", r"\${1} "),
        (r"`", r"\`"),
        (r"^~~~", r"\~~~"),
        (r"\[", r"\["),
        (r"\]", r"\]"),
        (r"^>", r"\>"),
        (r"_", r"\_"),
        (r"^(\d+)\. ", r"${1}\. "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        let regex = Regex::new(pattern).expect("escape pattern is valid");
        (regex, replacement)
    })
    .collect()
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n]+").expect("whitespace pattern is valid"));

static ATTRIBUTE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\n+\s*)+").expect("attribute pattern is valid"));

/// Backslash-escape characters that markdown would otherwise interpret.
pub fn escape_markdown(text: &str) -> String {
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (regex, replacement)| {
            regex.replace_all(&acc, *replacement).into_owned()
        })
}

/// Collapse runs of ASCII whitespace to a single space.
///
/// Non-breaking spaces survive, as they do in a browser.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

/// Fold line breaks inside an attribute value (`alt`, `title`) into one.
pub fn clean_attribute(value: &str) -> String {
    ATTRIBUTE_BREAKS.replace_all(value, "\n").into_owned()
}
