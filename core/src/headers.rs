//! Parsing of the raw response header block.

use serde::{Deserialize, Serialize};

use crate::http::ResponseHeaders;

/// How response header names are keyed in the parsed map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderNamePolicy {
    /// Keep names exactly as the server sent them.
    #[default]
    Verbatim,
    /// Lowercase names, for hosts that compare header names case-insensitively.
    Lowercase,
}

/// Parse a `getAllResponseHeaders`-style block into a map.
///
/// Lines are `name: value`, separated by `\n` or `\r\n`. Blank lines are
/// skipped. A line without a colon, or with an empty name, makes the whole
/// block malformed and an empty map is returned. When a name repeats, the
/// last value wins.
pub fn parse_response_headers(raw: &str, policy: HeaderNamePolicy) -> ResponseHeaders {
    let mut headers = ResponseHeaders::new();
    for line in raw.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            tracing::debug!(line, "malformed response header block");
            return ResponseHeaders::new();
        };
        let name = name.trim();
        if name.is_empty() {
            tracing::debug!(line, "malformed response header block");
            return ResponseHeaders::new();
        }
        let name = match policy {
            HeaderNamePolicy::Verbatim => name.to_string(),
            HeaderNamePolicy::Lowercase => name.to_ascii_lowercase(),
        };
        headers.insert(name, value.trim().to_string());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_header() {
        let headers = parse_response_headers("mykey: myvalue", HeaderNamePolicy::Verbatim);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["mykey"], "myvalue");
    }

    #[test]
    fn empty_block_is_empty_map() {
        assert!(parse_response_headers("", HeaderNamePolicy::Verbatim).is_empty());
        assert!(parse_response_headers("\r\n", HeaderNamePolicy::Verbatim).is_empty());
    }

    #[test]
    fn crlf_separated_block() {
        let raw = "Content-Type: text/plain\r\nX-Count: 3\r\n";
        let headers = parse_response_headers(raw, HeaderNamePolicy::Verbatim);
        assert_eq!(headers["Content-Type"], "text/plain");
        assert_eq!(headers["X-Count"], "3");
    }

    #[test]
    fn value_keeps_inner_colons() {
        let headers =
            parse_response_headers("Location: http://host:8080/x", HeaderNamePolicy::Verbatim);
        assert_eq!(headers["Location"], "http://host:8080/x");
    }

    #[test]
    fn lowercase_policy() {
        let headers = parse_response_headers("X-Echo: 1", HeaderNamePolicy::Lowercase);
        assert_eq!(headers.get("x-echo").map(String::as_str), Some("1"));
        assert!(!headers.contains_key("X-Echo"));
    }

    #[test]
    fn malformed_line_degrades_to_empty() {
        let raw = "good: yes\nthis line has no separator";
        assert!(parse_response_headers(raw, HeaderNamePolicy::Verbatim).is_empty());
    }

    #[test]
    fn empty_name_degrades_to_empty() {
        assert!(parse_response_headers(": value", HeaderNamePolicy::Verbatim).is_empty());
    }

    #[test]
    fn policy_deserializes_lowercase() {
        let policy: HeaderNamePolicy = serde_json::from_str(r#""lowercase""#).unwrap();
        assert_eq!(policy, HeaderNamePolicy::Lowercase);
    }
}
