/// Punctuation left unescaped on top of the RFC 3986 unreserved set, as
/// `encodeURIComponent` does.
const KEPT: [char; 5] = ['!', '\'', '(', ')', '*'];

/// Serialize key/value pairs as `application/x-www-form-urlencoded`.
///
/// Keys and values are percent-encoded individually; spaces become `%20`,
/// not `+`.
pub fn encode_form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(at) = rest.find(KEPT) {
        out.push_str(&urlencoding::encode(&rest[..at]));
        // Every kept character is a single ASCII byte.
        out.push_str(&rest[at..=at]);
        rest = &rest[at + 1..];
    }
    out.push_str(&urlencoding::encode(rest));
    out
}
