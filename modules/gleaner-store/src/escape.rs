//! SPARQL literal escaping helpers, matching the escaping contract the
//! rest of the platform uses when building queries by hand.

use chrono::{DateTime, Utc};

/// Render a URI as a SPARQL IRI ref. Angle brackets and whitespace inside
/// the URI are percent-escaped so the ref cannot be broken open.
pub fn escape_uri(uri: &str) -> String {
    let mut inner = String::with_capacity(uri.len());
    for c in uri.chars() {
        match c {
            '<' => inner.push_str("%3C"),
            '>' => inner.push_str("%3E"),
            '"' => inner.push_str("%22"),
            ' ' => inner.push_str("%20"),
            '\n' | '\r' | '\t' => {}
            _ => inner.push(c),
        }
    }
    format!("<{inner}>")
}

/// Render a string as a quoted SPARQL literal.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a timestamp as an xsd:dateTime literal.
pub fn escape_datetime(dt: &DateTime<Utc>) -> String {
    format!(
        "\"{}\"^^<http://www.w3.org/2001/XMLSchema#dateTime>",
        dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")
    )
}
