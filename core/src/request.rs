//! The request wrapper: one native handle, two handlers, one terminal outcome.
//!
//! # Design
//! `Request` owns its state behind `Rc<RefCell<_>>`. The observer it
//! registers on the native handle holds only a `Weak` to that state, so a
//! native handle (or a host that keeps observers around) never keeps a
//! request alive. On the terminal readiness change the native handle and
//! both handlers are moved out of the state and the borrow is released
//! before the chosen handler runs; handlers are therefore free to call back
//! into the request, including `dispose`.
//!
//! The model is single-threaded and cooperative: every readiness change is
//! delivered on the thread that owns the request.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use uuid::Uuid;

use crate::config::RequestConfig;
use crate::error::RequestError;
use crate::headers::parse_response_headers;
use crate::http::{is_success_status, HttpMethod, ResponseHeaders};
use crate::native::{Host, NativeRequest, NativeResponse, ReadyStateObserver};

/// Invoked with `(body, status, headers)` when the exchange succeeds.
pub type SuccessHandler = Box<dyn FnOnce(String, u16, ResponseHeaders)>;

/// Invoked with `(body, status)` when the exchange fails.
pub type ErrorHandler = Box<dyn FnOnce(String, u16)>;

/// Lifecycle of a `Request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Constructed and possibly configured; `send` has not run.
    Created,
    /// Sent; waiting for the native handle to report completion.
    InFlight,
    /// Completed with a success status.
    Succeeded,
    /// Completed with an error status, or the native failed during `send`.
    Failed,
    /// Disposed by its owner.
    Disposed,
}

impl RequestState {
    /// Whether no further handler can fire.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Succeeded | RequestState::Failed | RequestState::Disposed
        )
    }
}

struct Inner<N> {
    url: String,
    method: HttpMethod,
    content_type: String,
    config: RequestConfig,
    asynchronous: bool,
    data: Option<String>,
    on_success: Option<SuccessHandler>,
    on_error: Option<ErrorHandler>,
    native: Option<N>,
    state: RequestState,
}

/// Outcome of a terminal readiness change, dispatched after the borrow on
/// the request state has been released.
enum Completion {
    Success {
        handler: Option<SuccessHandler>,
        body: String,
        status: u16,
        headers: ResponseHeaders,
    },
    Failure {
        handler: Option<ErrorHandler>,
        body: String,
        status: u16,
    },
}

impl Completion {
    fn dispatch(self) {
        match self {
            Completion::Success {
                handler,
                body,
                status,
                headers,
            } => match handler {
                Some(handler) => handler(body, status, headers),
                None => tracing::debug!(status, "request succeeded without a success handler"),
            },
            Completion::Failure {
                handler,
                body,
                status,
            } => match handler {
                Some(handler) => handler(body, status),
                None => tracing::warn!(status, "request failed without an error handler"),
            },
        }
    }
}

impl<N> Inner<N> {
    fn check_configurable(&self) -> Result<(), RequestError> {
        match self.state {
            RequestState::Created => Ok(()),
            RequestState::Disposed => Err(RequestError::Disposed),
            _ => Err(RequestError::AlreadySent),
        }
    }

    /// URL passed to `open`: GET data moves into the query string, then the
    /// cache-busting parameter is appended.
    fn target_url(&self) -> String {
        let (base, fragment) = match self.url.split_once('#') {
            Some((base, fragment)) => (base, Some(fragment)),
            None => (self.url.as_str(), None),
        };
        let mut url = base.to_string();
        if self.method == HttpMethod::Get {
            if let Some(data) = self.data.as_deref().filter(|d| !d.is_empty()) {
                push_query(&mut url, data);
            }
        }
        let token = Uuid::new_v4().simple();
        push_query(&mut url, &format!("{}={token}", self.config.cache_bust_param));
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        url
    }

    fn body(&self) -> Option<String> {
        match self.method {
            HttpMethod::Get => None,
            _ => self.data.clone(),
        }
    }

    /// Handle a readiness change. On a terminal change the native handle is
    /// returned alongside the completion so the caller can drop it once the
    /// borrow on the state has ended.
    fn on_ready_state_change(
        &mut self,
        response: &dyn NativeResponse,
    ) -> Option<(Completion, Option<N>)> {
        let ready_state = response.ready_state();
        if self.state != RequestState::InFlight {
            tracing::trace!(?ready_state, state = ?self.state, "ignoring readiness change");
            return None;
        }
        if !ready_state.is_terminal() {
            tracing::trace!(?ready_state, url = %self.url, "readiness change");
            return None;
        }

        let status = response.status();
        let body = response.response_text();
        let native = self.native.take();
        let on_success = self.on_success.take();
        let on_error = self.on_error.take();

        if is_success_status(status) {
            self.state = RequestState::Succeeded;
            let headers =
                parse_response_headers(&response.all_response_headers(), self.config.header_names);
            tracing::debug!(status, url = %self.url, "request succeeded");
            let completion = Completion::Success {
                handler: on_success,
                body,
                status,
                headers,
            };
            Some((completion, native))
        } else {
            self.state = RequestState::Failed;
            tracing::debug!(status, url = %self.url, "request failed");
            let completion = Completion::Failure {
                handler: on_error,
                body,
                status,
            };
            Some((completion, native))
        }
    }
}

fn push_query(url: &mut String, param: &str) {
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(param);
}

fn observer<N: 'static>(state: Weak<RefCell<Inner<N>>>) -> ReadyStateObserver {
    Box::new(move |response: &dyn NativeResponse| {
        let Some(state) = state.upgrade() else {
            return;
        };
        let completion = match state.try_borrow_mut() {
            Ok(mut inner) => inner.on_ready_state_change(response),
            Err(_) => {
                tracing::warn!("readiness change delivered while the request was busy");
                None
            }
        };
        if let Some((completion, native)) = completion {
            drop(native);
            completion.dispatch();
        }
    })
}

/// A single HTTP exchange driven through a host's native request primitive.
pub struct Request<H: Host> {
    host: H,
    inner: Rc<RefCell<Inner<H::Native>>>,
}

impl<H: Host> Request<H> {
    pub fn new(host: H, url: &str, method: HttpMethod, content_type: &str) -> Self {
        Self::with_config(host, url, method, content_type, RequestConfig::default())
    }

    pub fn with_config(
        host: H,
        url: &str,
        method: HttpMethod,
        content_type: &str,
        config: RequestConfig,
    ) -> Self {
        let inner = Inner {
            url: url.to_string(),
            method,
            content_type: content_type.to_string(),
            asynchronous: config.asynchronous,
            config,
            data: None,
            on_success: None,
            on_error: None,
            native: None,
            state: RequestState::Created,
        };
        Self {
            host,
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    pub fn url(&self) -> String {
        self.inner.borrow().url.clone()
    }

    pub fn method(&self) -> HttpMethod {
        self.inner.borrow().method
    }

    pub fn content_type(&self) -> String {
        self.inner.borrow().content_type.clone()
    }

    pub fn state(&self) -> RequestState {
        self.inner.borrow().state
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == RequestState::Disposed
    }

    /// Whether a native handle is currently held.
    pub fn has_native(&self) -> bool {
        self.inner.borrow().native.is_some()
    }

    /// Whether either handler is still held.
    pub fn has_handlers(&self) -> bool {
        let inner = self.inner.borrow();
        inner.on_success.is_some() || inner.on_error.is_some()
    }

    pub fn asynchronous(&self) -> bool {
        self.inner.borrow().asynchronous
    }

    pub fn set_asynchronous(&self, asynchronous: bool) -> Result<(), RequestError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_configurable()?;
        inner.asynchronous = asynchronous;
        Ok(())
    }

    pub fn data(&self) -> Option<String> {
        self.inner.borrow().data.clone()
    }

    pub fn set_data(&self, data: impl Into<String>) -> Result<(), RequestError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_configurable()?;
        inner.data = Some(data.into());
        Ok(())
    }

    pub fn set_handle_success<F>(&self, handler: F) -> Result<(), RequestError>
    where
        F: FnOnce(String, u16, ResponseHeaders) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner.check_configurable()?;
        inner.on_success = Some(Box::new(handler));
        Ok(())
    }

    pub fn set_handle_error<F>(&self, handler: F) -> Result<(), RequestError>
    where
        F: FnOnce(String, u16) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner.check_configurable()?;
        inner.on_error = Some(Box::new(handler));
        Ok(())
    }

    /// Open, configure and dispatch a native request.
    ///
    /// In synchronous mode the host completes the exchange inside this call
    /// and the chosen handler has already run when it returns. A native
    /// failure leaves the request `Failed` without invoking any handler.
    pub fn send(&self) -> Result<(), RequestError> {
        let (method, url, asynchronous, body, headers) = {
            let mut inner = self.inner.borrow_mut();
            inner.check_configurable()?;
            let headers = self.standard_headers(&inner);
            let prepared = (
                inner.method,
                inner.target_url(),
                inner.asynchronous,
                inner.body(),
                headers,
            );
            inner.state = RequestState::InFlight;
            prepared
        };

        tracing::debug!(%method, %url, asynchronous, "sending request");

        let mut native = match self.host.create_native() {
            Ok(native) => native,
            Err(err) => return Err(self.fail_send(err.into())),
        };
        native.set_on_ready_state_change(observer(Rc::downgrade(&self.inner)));

        let dispatched = native
            .open(method, &url, asynchronous)
            .and_then(|()| {
                headers
                    .iter()
                    .try_for_each(|(name, value)| native.set_request_header(name, value))
            })
            .and_then(|()| native.send(body.as_deref()));
        if let Err(err) = dispatched {
            drop(native);
            return Err(self.fail_send(err.into()));
        }

        let mut inner = self.inner.borrow_mut();
        if inner.state == RequestState::InFlight {
            inner.native = Some(native);
        } else {
            tracing::trace!(state = ?inner.state, "request completed during send");
        }
        Ok(())
    }

    /// Abort an in-flight exchange and release the native handle and both
    /// handlers. Never fails; calling it again has no effect.
    pub fn dispose(&self) {
        let (native, was_in_flight, handlers) = {
            let Ok(mut inner) = self.inner.try_borrow_mut() else {
                tracing::warn!("dispose called while the request was busy");
                return;
            };
            if inner.state == RequestState::Disposed {
                return;
            }
            let was_in_flight = inner.state == RequestState::InFlight;
            inner.state = RequestState::Disposed;
            let handlers = (inner.on_success.take(), inner.on_error.take());
            (inner.native.take(), was_in_flight, handlers)
        };
        drop(handlers);
        if let Some(mut native) = native {
            if was_in_flight {
                tracing::debug!("aborting in-flight request");
                native.abort();
            }
        }
    }

    fn standard_headers(&self, inner: &Inner<H::Native>) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(4);
        if !self.host.sets_referer_natively() {
            if let Some(location) = self.host.location() {
                headers.push(("Referer", location));
            }
        }
        headers.push((
            "Content-Type",
            inner.config.content_type_header(&inner.content_type),
        ));
        if inner.config.send_pragma {
            headers.push(("Pragma", "no-cache".to_string()));
        }
        headers.push(("Cache-Control", "no-cache".to_string()));
        headers
    }

    fn fail_send(&self, err: RequestError) -> RequestError {
        tracing::warn!(error = %err, "native request failed during send");
        let handlers = {
            let mut inner = self.inner.borrow_mut();
            inner.native = None;
            if inner.state == RequestState::InFlight {
                inner.state = RequestState::Failed;
            }
            (inner.on_success.take(), inner.on_error.take())
        };
        drop(handlers);
        err
    }
}

impl<H: Host> Drop for Request<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
