//! The boundary to the host runtime's native request primitive.
//!
//! # Design
//! The wrapper never performs I/O itself. A `Host` hands out
//! `NativeRequest` handles; the wrapper opens, configures and sends them,
//! and the handle reports progress by invoking the registered observer with
//! a `NativeResponse` view of itself. The view is passed in rather than read
//! back from the stored handle so that a handle completing inside its own
//! `send` (synchronous mode) can still be observed.

use crate::error::NativeError;
use crate::http::{HttpMethod, HttpResponse, ReadyState};

/// Readiness-change observer registered on a native handle.
pub type ReadyStateObserver = Box<dyn FnMut(&dyn NativeResponse)>;

/// Minimal surface of a native asynchronous HTTP request.
pub trait NativeRequest {
    fn open(&mut self, method: HttpMethod, url: &str, asynchronous: bool)
        -> Result<(), NativeError>;

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), NativeError>;

    /// Register the observer invoked on every readiness change. Replaces any
    /// previously registered observer.
    fn set_on_ready_state_change(&mut self, observer: ReadyStateObserver);

    fn send(&mut self, body: Option<&str>) -> Result<(), NativeError>;

    /// Cancel an in-flight exchange. Must not invoke the observer.
    fn abort(&mut self);
}

/// Observable fields of a native handle at the time of a readiness change.
pub trait NativeResponse {
    fn ready_state(&self) -> ReadyState;
    fn status(&self) -> u16;
    fn response_text(&self) -> String;
    /// The raw header block, one `name: value` per line.
    fn all_response_headers(&self) -> String;
}

/// The runtime collaborator that owns the native primitive.
pub trait Host {
    type Native: NativeRequest + 'static;

    fn create_native(&self) -> Result<Self::Native, NativeError>;

    /// Current document location, used as the `Referer` header.
    fn location(&self) -> Option<String>;

    /// True when the runtime sets `Referer` itself and rejects manual
    /// overrides (WebKit-family browsers).
    fn sets_referer_natively(&self) -> bool {
        false
    }
}

/// A frozen copy of a native handle's observable fields.
///
/// Hosts that cannot lend out the handle itself while notifying (the test
/// double, the C ABI) pass one of these to the observer instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessSnapshot {
    pub ready_state: ReadyState,
    pub response: HttpResponse,
}

impl NativeResponse for ReadinessSnapshot {
    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn status(&self) -> u16 {
        self.response.status
    }

    fn response_text(&self) -> String {
        self.response.body.clone()
    }

    fn all_response_headers(&self) -> String {
        self.response.headers.clone()
    }
}
