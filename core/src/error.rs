//! Error types for the request wrapper.
//!
//! # Design
//! Transport outcomes are not errors here: a failed HTTP exchange is a
//! status code delivered to the error handler. `RequestError` covers only
//! what the caller can get wrong (using a request after it was sent or
//! disposed, an unknown verb, a bad configuration) and what the native
//! primitive refuses to do.

use std::fmt;

/// A native request operation that failed, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Name of the native operation, e.g. `"open"` or `"setRequestHeader"`.
    pub operation: &'static str,
    pub message: String,
}

impl NativeError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native {} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for NativeError {}

/// Errors returned by `Request` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// `send` already ran; the request can no longer be configured or sent.
    AlreadySent,

    /// `dispose` already ran; the request is inert.
    Disposed,

    /// The method string is not an HTTP verb this crate knows.
    InvalidMethod(String),

    /// The native primitive rejected an operation during `send`.
    Native(NativeError),

    /// A configuration document could not be read.
    Config(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::AlreadySent => write!(f, "request already sent"),
            RequestError::Disposed => write!(f, "request disposed"),
            RequestError::InvalidMethod(method) => {
                write!(f, "invalid HTTP method: {method}")
            }
            RequestError::Native(err) => write!(f, "{err}"),
            RequestError::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Native(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NativeError> for RequestError {
    fn from(err: NativeError) -> Self {
        RequestError::Native(err)
    }
}
