//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! The host supplies its native request primitive as a table of function
//! pointers (`FfiHost`) and receives outcomes through plain C callbacks.
//! Strings handed to host callbacks are borrowed for the duration of the
//! call only; strings returned from `nreq_*` functions are owned by the
//! caller and released with `nreq_free_string`.

use std::ffi::c_void;
use std::os::raw::c_char;

use nativereq_core::{Request, RequestError, RequestState};

use crate::native::FfiHostAdapter;

/// Opaque handle to a `Request`. C callers receive a pointer to this and
/// pass it back into every `nreq_request_*` function.
pub struct FfiRequest {
    pub(crate) inner: Request<FfiHostAdapter>,
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Result code of fallible FFI calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    Ok = 0,
    NullArg = 1,
    InvalidArg = 2,
    AlreadySent = 3,
    Disposed = 4,
    Native = 5,
    Panic = 6,
}

impl From<&RequestError> for FfiStatus {
    fn from(err: &RequestError) -> Self {
        match err {
            RequestError::AlreadySent => FfiStatus::AlreadySent,
            RequestError::Disposed => FfiStatus::Disposed,
            RequestError::InvalidMethod(_) | RequestError::Config(_) => FfiStatus::InvalidArg,
            RequestError::Native(_) => FfiStatus::Native,
        }
    }
}

impl<T> From<Result<T, RequestError>> for FfiStatus {
    fn from(result: Result<T, RequestError>) -> Self {
        match result {
            Ok(_) => FfiStatus::Ok,
            Err(err) => (&err).into(),
        }
    }
}

/// Lifecycle state as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiRequestState {
    Created = 0,
    InFlight = 1,
    Succeeded = 2,
    Failed = 3,
    Disposed = 4,
}

impl From<RequestState> for FfiRequestState {
    fn from(state: RequestState) -> Self {
        match state {
            RequestState::Created => FfiRequestState::Created,
            RequestState::InFlight => FfiRequestState::InFlight,
            RequestState::Succeeded => FfiRequestState::Succeeded,
            RequestState::Failed => FfiRequestState::Failed,
            RequestState::Disposed => FfiRequestState::Disposed,
        }
    }
}

// ---------------------------------------------------------------------------
// Host function table
// ---------------------------------------------------------------------------

/// Create the host's native request identified by `native_id`. Return 0 on
/// success.
pub type FfiCreateNativeFn = extern "C" fn(user_data: *mut c_void, native_id: u64) -> i32;

pub type FfiOpenFn = extern "C" fn(
    user_data: *mut c_void,
    native_id: u64,
    method: *const c_char,
    url: *const c_char,
    asynchronous: bool,
) -> i32;

pub type FfiSetRequestHeaderFn = extern "C" fn(
    user_data: *mut c_void,
    native_id: u64,
    name: *const c_char,
    value: *const c_char,
) -> i32;

/// `body` is null when the request has no body.
pub type FfiSendFn =
    extern "C" fn(user_data: *mut c_void, native_id: u64, body: *const c_char) -> i32;

pub type FfiAbortFn = extern "C" fn(user_data: *mut c_void, native_id: u64);

/// The native request is no longer referenced and may be freed. May be
/// invoked from inside `nreq_ready_state_changed`.
pub type FfiReleaseNativeFn = extern "C" fn(user_data: *mut c_void, native_id: u64);

/// The host runtime as seen from Rust.
///
/// Every function pointer except `release_native` is required. `location`
/// may be null, in which case no `Referer` header is set.
#[repr(C)]
pub struct FfiHost {
    pub user_data: *mut c_void,
    pub create_native: Option<FfiCreateNativeFn>,
    pub open: Option<FfiOpenFn>,
    pub set_request_header: Option<FfiSetRequestHeaderFn>,
    pub send: Option<FfiSendFn>,
    pub abort: Option<FfiAbortFn>,
    pub release_native: Option<FfiReleaseNativeFn>,
    pub location: *const c_char,
    pub sets_referer_natively: bool,
}

// ---------------------------------------------------------------------------
// Handler callbacks
// ---------------------------------------------------------------------------

/// A single response header, borrowed for the duration of a callback.
#[repr(C)]
pub struct FfiHeader {
    pub key: *const c_char,
    pub value: *const c_char,
}

pub type FfiSuccessCallback = extern "C" fn(
    user_data: *mut c_void,
    body: *const c_char,
    status: u16,
    headers: *const FfiHeader,
    headers_len: u32,
);

pub type FfiErrorCallback = extern "C" fn(user_data: *mut c_void, body: *const c_char, status: u16);
