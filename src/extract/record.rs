//! Record boundary detection and rewriting.
//!
//! A page document wraps each result in `<record>...</record>`. The body of
//! a record is an RDF document followed by a relevance score element that
//! only makes sense inside a result list, so it is cut off before the body
//! is stored on its own.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// Declaration prepended to every record so it stands alone as a document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Start of the relevance score annotation inside a record body.
pub const SCORE_MARKER: &str = "<rel:score";

/// Shortest match between an opening and a closing record tag, across lines.
/// Matches raw bytes, so pages need not be valid UTF-8.
#[allow(clippy::expect_used)]
static RECORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)<record>(.*?)</record>").expect("record regex is valid") // Static pattern, safe to panic
});

/// Yields the body of every non-empty record in `contents`, in document order.
pub fn record_bodies(contents: &[u8]) -> impl Iterator<Item = &[u8]> {
    RECORD_PATTERN
        .captures_iter(contents)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_bytes())
        .filter(|body| !body.is_empty())
}

/// Cuts `body` at the first score annotation, if there is one.
#[must_use]
pub fn strip_score(body: &[u8]) -> &[u8] {
    let marker = SCORE_MARKER.as_bytes();
    match body.windows(marker.len()).position(|window| window == marker) {
        Some(start) => &body[..start],
        None => body,
    }
}

/// Rewrites a record body into a standalone document.
#[must_use]
pub fn standalone_record(body: &[u8]) -> Vec<u8> {
    let body = strip_score(body);
    let mut document = Vec::with_capacity(XML_DECLARATION.len() + body.len());
    document.extend_from_slice(XML_DECLARATION.as_bytes());
    document.extend_from_slice(body);
    document
}
