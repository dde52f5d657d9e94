//! C-ABI wrapper around `nativereq-core`.
//!
//! # Overview
//! Lets a host written in any language with a C FFI drive the request
//! lifecycle: the host implements the native request primitive as an
//! `FfiHost` function table, reports readiness changes with
//! `nreq_ready_state_changed`, and receives outcomes through C callbacks.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Fallible calls return an `FfiStatus` code; constructors return null on
//!   failure.
//! - Requests are single-threaded: every call for a given request, and every
//!   readiness report for its native, must come from the thread that
//!   created it.
//! - The C caller owns returned pointers and releases them with
//!   `nreq_request_free` / `nreq_free_string`.

pub mod native;
pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use nativereq_core::{
    HttpMethod, HttpResponse, ReadinessSnapshot, ReadyState, Request, RequestConfig,
    ResponseHeaders,
};

use native::{lossy_string, FfiHostAdapter};
use types::*;

/// Borrow a non-null C string as UTF-8.
///
/// # Safety
/// `ptr` must be a valid NUL-terminated string.
unsafe fn utf8<'a>(ptr: *const c_char) -> Option<&'a str> {
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Copy a string for C, dropping interior NULs.
fn owned_c_string(value: String) -> CString {
    CString::new(value.replace('\0', "")).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Request lifecycle
// ---------------------------------------------------------------------------

fn new_request(
    url: *const c_char,
    method: *const c_char,
    content_type: *const c_char,
    host: *const FfiHost,
    config: RequestConfig,
) -> *mut FfiRequest {
    if url.is_null() || method.is_null() || content_type.is_null() || host.is_null() {
        return std::ptr::null_mut();
    }
    let (Some(url), Some(method), Some(content_type)) =
        (unsafe { utf8(url) }, unsafe { utf8(method) }, unsafe { utf8(content_type) })
    else {
        return std::ptr::null_mut();
    };
    let Ok(method) = method.parse::<HttpMethod>() else {
        tracing::warn!(method, "rejecting unknown HTTP method");
        return std::ptr::null_mut();
    };
    let Some(host) = (unsafe { FfiHostAdapter::from_ffi(&*host) }) else {
        tracing::warn!("host function table is incomplete");
        return std::ptr::null_mut();
    };
    let inner = Request::with_config(host, url, method, content_type, config);
    Box::into_raw(Box::new(FfiRequest { inner }))
}

/// Create a request for `url` with the given method and content type.
///
/// Returns null if any argument is null or not UTF-8, if `method` is not an
/// HTTP verb, if a required host function is missing, or if an internal
/// panic occurs. The `FfiHost` table is copied; `host` need not outlive the
/// call. The caller must free the result with `nreq_request_free`.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_new(
    url: *const c_char,
    method: *const c_char,
    content_type: *const c_char,
    host: *const FfiHost,
) -> *mut FfiRequest {
    catch_unwind(AssertUnwindSafe(|| {
        new_request(url, method, content_type, host, RequestConfig::default())
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Like `nreq_request_new`, with a JSON `RequestConfig` document.
///
/// Returns null if `config_json` is null or not a valid configuration.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_new_with_config(
    url: *const c_char,
    method: *const c_char,
    content_type: *const c_char,
    host: *const FfiHost,
    config_json: *const c_char,
) -> *mut FfiRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if config_json.is_null() {
            return std::ptr::null_mut();
        }
        let Some(raw) = (unsafe { utf8(config_json) }) else {
            return std::ptr::null_mut();
        };
        match RequestConfig::from_json(raw) {
            Ok(config) => new_request(url, method, content_type, host, config),
            Err(err) => {
                tracing::warn!(error = %err, "rejecting request configuration");
                std::ptr::null_mut()
            }
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Free a request created by `nreq_request_new*`, aborting it if it is still
/// in flight. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_free(request: *mut FfiRequest) {
    if !request.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(request) });
        }));
    }
}

/// Abort an in-flight request and release its handlers. The request stays
/// allocated until `nreq_request_free`. Safe to call with null and in any
/// state.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_dispose(request: *const FfiRequest) {
    if !request.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            unsafe { &*request }.inner.dispose();
        }));
    }
}

/// Open, configure and dispatch the native request.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_send(request: *const FfiRequest) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return FfiStatus::NullArg;
        }
        unsafe { &*request }.inner.send().into()
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Lifecycle state of `request`. A null request reports `Disposed`.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_state(request: *const FfiRequest) -> FfiRequestState {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return FfiRequestState::Disposed;
        }
        unsafe { &*request }.inner.state().into()
    }))
    .unwrap_or(FfiRequestState::Disposed)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_set_asynchronous(
    request: *const FfiRequest,
    asynchronous: bool,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return FfiStatus::NullArg;
        }
        unsafe { &*request }.inner.set_asynchronous(asynchronous).into()
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Dispatch mode of `request`; false for null.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_get_asynchronous(request: *const FfiRequest) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        !request.is_null() && unsafe { &*request }.inner.asynchronous()
    }))
    .unwrap_or(false)
}

/// Set the request body. `data` must be valid UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_set_data(
    request: *const FfiRequest,
    data: *const c_char,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() || data.is_null() {
            return FfiStatus::NullArg;
        }
        let Some(data) = (unsafe { utf8(data) }) else {
            return FfiStatus::InvalidArg;
        };
        unsafe { &*request }.inner.set_data(data).into()
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Copy of the request body, or null if none was set. Free with
/// `nreq_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_get_data(request: *const FfiRequest) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return std::ptr::null_mut();
        }
        match unsafe { &*request }.inner.data() {
            Some(data) => owned_c_string(data).into_raw(),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Register the success callback. `user_data` is passed back verbatim; the
/// strings and header array are valid only during the callback.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_set_handle_success(
    request: *const FfiRequest,
    callback: Option<FfiSuccessCallback>,
    user_data: *mut c_void,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(callback) = callback else {
            return FfiStatus::NullArg;
        };
        if request.is_null() {
            return FfiStatus::NullArg;
        }
        let handler = move |body: String, status: u16, headers: ResponseHeaders| {
            let body = owned_c_string(body);
            let owned: Vec<(CString, CString)> = headers
                .into_iter()
                .map(|(k, v)| (owned_c_string(k), owned_c_string(v)))
                .collect();
            let ffi_headers: Vec<FfiHeader> = owned
                .iter()
                .map(|(k, v)| FfiHeader {
                    key: k.as_ptr(),
                    value: v.as_ptr(),
                })
                .collect();
            let headers_ptr = if ffi_headers.is_empty() {
                std::ptr::null()
            } else {
                ffi_headers.as_ptr()
            };
            callback(
                user_data,
                body.as_ptr(),
                status,
                headers_ptr,
                u32::try_from(ffi_headers.len()).unwrap_or(u32::MAX),
            );
        };
        unsafe { &*request }.inner.set_handle_success(handler).into()
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Register the error callback. `body` is valid only during the callback.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_request_set_handle_error(
    request: *const FfiRequest,
    callback: Option<FfiErrorCallback>,
    user_data: *mut c_void,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(callback) = callback else {
            return FfiStatus::NullArg;
        };
        if request.is_null() {
            return FfiStatus::NullArg;
        }
        let handler = move |body: String, status: u16| {
            let body = owned_c_string(body);
            callback(user_data, body.as_ptr(), status);
        };
        unsafe { &*request }.inner.set_handle_error(handler).into()
    }))
    .unwrap_or(FfiStatus::Panic)
}

// ---------------------------------------------------------------------------
// Host notifications
// ---------------------------------------------------------------------------

/// Report a readiness change of the native request `native_id`.
///
/// `ready_state` follows the 0..=4 convention. `response_text` and
/// `response_headers` (the raw `name: value` block) may be null and are read
/// only for the duration of the call. Returns `InvalidArg` for an unknown
/// readiness value or a native that is no longer live; the latter is
/// expected after a request completed or was disposed.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_ready_state_changed(
    native_id: u64,
    ready_state: i32,
    status: u16,
    response_text: *const c_char,
    response_headers: *const c_char,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(ready_state) = ReadyState::from_code(ready_state) else {
            return FfiStatus::InvalidArg;
        };
        let snapshot = ReadinessSnapshot {
            ready_state,
            response: HttpResponse {
                status,
                headers: unsafe { lossy_string(response_headers) },
                body: unsafe { lossy_string(response_text) },
            },
        };
        if native::deliver(native_id, &snapshot) {
            FfiStatus::Ok
        } else {
            tracing::debug!(native_id, "readiness change for unknown native");
            FfiStatus::InvalidArg
        }
    }))
    .unwrap_or(FfiStatus::Panic)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn nreq_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
