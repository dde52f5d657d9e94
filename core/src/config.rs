//! Per-request configuration.
//!
//! # Design
//! Every field has a default, so an empty JSON object is a valid
//! configuration and hosts only spell out what they change.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::headers::HeaderNamePolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Charset appended to the configured content type.
    pub charset: String,

    /// Query parameter carrying the cache-busting token.
    pub cache_bust_param: String,

    /// Keying of parsed response headers.
    pub header_names: HeaderNamePolicy,

    /// Emit `Pragma: no-cache` alongside `Cache-Control`.
    pub send_pragma: bool,

    /// Initial dispatch mode of new requests.
    pub asynchronous: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            charset: "UTF-8".to_string(),
            cache_bust_param: "nocache".to_string(),
            header_names: HeaderNamePolicy::Verbatim,
            send_pragma: true,
            asynchronous: true,
        }
    }
}

impl RequestConfig {
    pub fn from_json(raw: &str) -> Result<Self, RequestError> {
        serde_json::from_str(raw).map_err(|e| RequestError::Config(e.to_string()))
    }

    /// Content-Type header value for `content_type`.
    pub fn content_type_header(&self, content_type: &str) -> String {
        format!("{content_type}; charset={}", self.charset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = RequestConfig::from_json("{}").unwrap();
        assert_eq!(config, RequestConfig::default());
    }

    #[test]
    fn partial_override() {
        let config =
            RequestConfig::from_json(r#"{"charset":"ISO-8859-1","header_names":"lowercase"}"#)
                .unwrap();
        assert_eq!(config.charset, "ISO-8859-1");
        assert_eq!(config.header_names, HeaderNamePolicy::Lowercase);
        assert_eq!(config.cache_bust_param, "nocache");
        assert!(config.send_pragma);
        assert!(config.asynchronous);
    }

    #[test]
    fn invalid_json_is_config_error() {
        let err = RequestConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, RequestError::Config(_)));
    }

    #[test]
    fn content_type_header_appends_charset() {
        let config = RequestConfig::default();
        assert_eq!(
            config.content_type_header("application/x-www-form-urlencoded"),
            "application/x-www-form-urlencoded; charset=UTF-8"
        );
    }
}
