//! Recording test double of the native request primitive.
//!
//! `MockHost` hands out `MockNative` handles and keeps a `MockNativeHandle`
//! to each one, in creation order. A handle exposes the log of calls the
//! request made on the native and lets a test drive readiness changes by
//! hand, the way a host runtime's network stack would.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::NativeError;
use crate::http::{HttpMethod, HttpResponse, ReadyState};
use crate::native::{Host, NativeRequest, ReadinessSnapshot, ReadyStateObserver};

/// One call made on a native handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    Open {
        method: HttpMethod,
        url: String,
        asynchronous: bool,
    },
    SetRequestHeader {
        name: String,
        value: String,
    },
    Send {
        body: Option<String>,
    },
    Abort,
}

struct NativeState {
    calls: Vec<NativeCall>,
    ready_state: ReadyState,
    response: HttpResponse,
    observer: Option<ReadyStateObserver>,
    released: bool,
}

impl NativeState {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            ready_state: ReadyState::Unsent,
            response: HttpResponse::default(),
            observer: None,
            released: false,
        }
    }

    fn snapshot(&self) -> ReadinessSnapshot {
        ReadinessSnapshot {
            ready_state: self.ready_state,
            response: self.response.clone(),
        }
    }
}

/// Invoke the registered observer without holding a borrow on the state, so
/// the observer may drop the native or read the log.
fn notify(state: &Rc<RefCell<NativeState>>) {
    let (observer, snapshot) = {
        let mut state = state.borrow_mut();
        (state.observer.take(), state.snapshot())
    };
    if let Some(mut observer) = observer {
        observer(&snapshot);
        let mut state = state.borrow_mut();
        if state.observer.is_none() {
            state.observer = Some(observer);
        }
    }
}

/// Test-side view of a native handle created by `MockHost`.
#[derive(Clone)]
pub struct MockNativeHandle {
    state: Rc<RefCell<NativeState>>,
}

impl MockNativeHandle {
    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.borrow().calls.clone()
    }

    /// First logged call matching `predicate`.
    pub fn find_call(&self, predicate: impl Fn(&NativeCall) -> bool) -> Option<NativeCall> {
        self.state.borrow().calls.iter().find(|c| predicate(*c)).cloned()
    }

    /// Arguments of the first `open` call.
    pub fn open_call(&self) -> Option<(HttpMethod, String, bool)> {
        match self.find_call(|c| matches!(c, NativeCall::Open { .. }))? {
            NativeCall::Open {
                method,
                url,
                asynchronous,
            } => Some((method, url, asynchronous)),
            _ => None,
        }
    }

    /// Value of the first request header set under `name`.
    pub fn header(&self, name: &str) -> Option<String> {
        let call = self.find_call(
            |c| matches!(c, NativeCall::SetRequestHeader { name: n, .. } if n == name),
        )?;
        match call {
            NativeCall::SetRequestHeader { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Body argument of the `send` call; `None` if `send` was never called.
    pub fn sent_body(&self) -> Option<Option<String>> {
        match self.find_call(|c| matches!(c, NativeCall::Send { .. }))? {
            NativeCall::Send { body } => Some(body),
            _ => None,
        }
    }

    pub fn was_aborted(&self) -> bool {
        self.state.borrow().calls.contains(&NativeCall::Abort)
    }

    /// Whether the owning request has dropped the native.
    pub fn is_released(&self) -> bool {
        self.state.borrow().released
    }

    pub fn has_observer(&self) -> bool {
        self.state.borrow().observer.is_some()
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.state.borrow_mut().ready_state = ready_state;
    }

    pub fn set_status(&self, status: u16) {
        self.state.borrow_mut().response.status = status;
    }

    pub fn set_response_text(&self, text: &str) {
        self.state.borrow_mut().response.body = text.to_string();
    }

    pub fn set_response_headers(&self, headers: &str) {
        self.state.borrow_mut().response.headers = headers.to_string();
    }

    pub fn fire_ready_state_change(&self) {
        notify(&self.state);
    }

    /// Walk through headers-received, loading and done, completing with
    /// status 200, `body` and the optional raw header block.
    pub fn receive(&self, body: &str, headers: Option<&str>) {
        self.set_ready_state(ReadyState::HeadersReceived);
        self.fire_ready_state_change();
        self.set_ready_state(ReadyState::Loading);
        self.fire_ready_state_change();
        self.set_status(200);
        self.set_ready_state(ReadyState::Done);
        self.set_response_text(body);
        if let Some(headers) = headers {
            self.set_response_headers(headers);
        }
        self.fire_ready_state_change();
    }
}

/// Native handle given to the request under test.
pub struct MockNative {
    state: Rc<RefCell<NativeState>>,
    asynchronous: bool,
    sync_response: Option<HttpResponse>,
    fail_on: Option<&'static str>,
}

impl MockNative {
    fn log(&self, call: NativeCall, operation: &'static str) -> Result<(), NativeError> {
        self.state.borrow_mut().calls.push(call);
        match self.fail_on {
            Some(op) if op == operation => Err(NativeError::new(operation, "injected failure")),
            _ => Ok(()),
        }
    }
}

impl NativeRequest for MockNative {
    fn open(
        &mut self,
        method: HttpMethod,
        url: &str,
        asynchronous: bool,
    ) -> Result<(), NativeError> {
        self.log(
            NativeCall::Open {
                method,
                url: url.to_string(),
                asynchronous,
            },
            "open",
        )?;
        self.asynchronous = asynchronous;
        self.state.borrow_mut().ready_state = ReadyState::Opened;
        notify(&self.state);
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), NativeError> {
        self.log(
            NativeCall::SetRequestHeader {
                name: name.to_string(),
                value: value.to_string(),
            },
            "setRequestHeader",
        )
    }

    fn set_on_ready_state_change(&mut self, observer: ReadyStateObserver) {
        self.state.borrow_mut().observer = Some(observer);
    }

    fn send(&mut self, body: Option<&str>) -> Result<(), NativeError> {
        self.log(
            NativeCall::Send {
                body: body.map(str::to_string),
            },
            "send",
        )?;
        if !self.asynchronous {
            if let Some(response) = self.sync_response.clone() {
                self.state.borrow_mut().response = response;
                for ready_state in [
                    ReadyState::HeadersReceived,
                    ReadyState::Loading,
                    ReadyState::Done,
                ] {
                    self.state.borrow_mut().ready_state = ready_state;
                    notify(&self.state);
                }
            }
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.state.borrow_mut().calls.push(NativeCall::Abort);
    }
}

impl Drop for MockNative {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.released = true;
        }
    }
}

struct HostState {
    natives: Vec<MockNativeHandle>,
    location: Option<String>,
    native_referer: bool,
    sync_response: Option<HttpResponse>,
    fail_on: Option<&'static str>,
}

/// Host runtime double. Clones share one log of created natives.
#[derive(Clone)]
pub struct MockHost {
    state: Rc<RefCell<HostState>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                natives: Vec::new(),
                location: Some("http://127.0.0.1/app/index.html".to_string()),
                native_referer: false,
                sync_response: None,
                fail_on: None,
            })),
        }
    }

    pub fn with_location(self, location: Option<&str>) -> Self {
        self.state.borrow_mut().location = location.map(str::to_string);
        self
    }

    /// Behave like a WebKit-family runtime that sets `Referer` itself.
    pub fn with_native_referer(self, native_referer: bool) -> Self {
        self.state.borrow_mut().native_referer = native_referer;
        self
    }

    /// Complete synchronous sends inside `send` with `response`.
    pub fn complete_synchronously_with(self, response: HttpResponse) -> Self {
        self.state.borrow_mut().sync_response = Some(response);
        self
    }

    /// Fail the named native operation: `"create"`, `"open"`,
    /// `"setRequestHeader"` or `"send"`.
    pub fn fail_on(self, operation: &'static str) -> Self {
        self.state.borrow_mut().fail_on = Some(operation);
        self
    }

    /// Handles to every native created so far, oldest first.
    pub fn natives(&self) -> Vec<MockNativeHandle> {
        self.state.borrow().natives.clone()
    }

    pub fn last_native(&self) -> Option<MockNativeHandle> {
        self.state.borrow().natives.last().cloned()
    }
}

impl Host for MockHost {
    type Native = MockNative;

    fn create_native(&self) -> Result<MockNative, NativeError> {
        let mut host = self.state.borrow_mut();
        if host.fail_on == Some("create") {
            return Err(NativeError::new("create", "injected failure"));
        }
        let state = Rc::new(RefCell::new(NativeState::new()));
        host.natives.push(MockNativeHandle {
            state: state.clone(),
        });
        Ok(MockNative {
            state,
            asynchronous: true,
            sync_response: host.sync_response.clone(),
            fail_on: host.fail_on,
        })
    }

    fn location(&self) -> Option<String> {
        self.state.borrow().location.clone()
    }

    fn sets_referer_natively(&self) -> bool {
        self.state.borrow().native_referer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::native::NativeResponse;

    #[test]
    fn host_logs_natives_in_order() {
        let host = MockHost::new();
        let mut first = host.create_native().unwrap();
        let _second = host.create_native().unwrap();
        first.abort();

        let natives = host.natives();
        assert_eq!(natives.len(), 2);
        assert!(natives[0].was_aborted());
        assert!(!natives[1].was_aborted());
    }

    #[test]
    fn open_notifies_opened() {
        let host = MockHost::new();
        let mut native = host.create_native().unwrap();
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();
        native.set_on_ready_state_change(Box::new(move |r: &dyn NativeResponse| {
            sink.set(Some(r.ready_state()))
        }));

        native.open(HttpMethod::Get, "http://x/", true).unwrap();

        assert_eq!(seen.get(), Some(ReadyState::Opened));
        assert!(host.last_native().unwrap().has_observer());
    }

    #[test]
    fn drop_marks_released() {
        let host = MockHost::new();
        let native = host.create_native().unwrap();
        assert!(!host.last_native().unwrap().is_released());
        drop(native);
        assert!(host.last_native().unwrap().is_released());
    }

    #[test]
    fn injected_failure_is_logged_then_returned() {
        let host = MockHost::new().fail_on("send");
        let mut native = host.create_native().unwrap();
        let err = native.send(Some("x")).unwrap_err();

        assert_eq!(err.operation, "send");
        assert_eq!(host.last_native().unwrap().sent_body(), Some(Some("x".to_string())));
    }
}
