//! HTTP vocabulary shared by the request wrapper and its hosts.
//!
//! # Design
//! These types describe what crosses the boundary to the native request
//! primitive as plain data: the method passed to `open`, the readiness
//! values reported back, and the status classification that decides which
//! handler fires. None of them touch the network.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RequestError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// The verb as it is passed to the native `open` call.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(RequestError::InvalidMethod(s.to_string())),
        }
    }
}

/// Readiness of a native request handle, numbered 0 through 4 by the common
/// convention of host runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

impl ReadyState {
    /// Map a numeric readiness value. Values outside 0..=4 yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ReadyState::Unsent),
            1 => Some(ReadyState::Opened),
            2 => Some(ReadyState::HeadersReceived),
            3 => Some(ReadyState::Loading),
            4 => Some(ReadyState::Done),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_terminal(self) -> bool {
        self == ReadyState::Done
    }
}

/// Whether a terminal status routes to the success handler.
///
/// Any 2xx status and 304 (served from a validated cache) count as success.
/// Everything else, including 0 (the status a host reports when the
/// transport failed), routes to the error handler.
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status) || status == 304
}

/// A completed response described as plain data.
///
/// The test double and the C ABI both build their readiness snapshots from
/// this value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw header block as returned by the native `getAllResponseHeaders`.
    pub headers: String,
    pub body: String,
}

/// Response headers after parsing, keyed by header name.
pub type ResponseHeaders = HashMap<String, String>;
