//! Canonical record produced by the generator and consumed by every writer.

use serde::{Deserialize, Serialize};

/// One generated link.
///
/// Serializes as `{"n": .., "url": .., "label": ..}` in that key order; NDJSON and JSON
/// array output are exactly this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Sequence number substituted into the templates.
    pub n: i64,
    /// Absolute URL (scheme guaranteed).
    pub url: String,
    /// Rendered label, already HTML-escaped.
    pub label: String,
}

/// Escape text for HTML content and attribute values: `& < > " '`.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
