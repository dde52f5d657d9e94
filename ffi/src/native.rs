//! Native request handles implemented by the C host.
//!
//! Each `FfiNative` is identified by a `native_id` minted here and passed to
//! every host callback. Its readiness observer is kept in a thread-local
//! registry so the host can report progress with `nreq_ready_state_changed`
//! using nothing but that id, including re-entrantly from its own `send`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::rc::Rc;

use nativereq_core::{
    Host, HttpMethod, NativeError, NativeRequest, ReadinessSnapshot, ReadyStateObserver,
};

use crate::types::{
    FfiAbortFn, FfiCreateNativeFn, FfiHost, FfiOpenFn, FfiReleaseNativeFn, FfiSendFn,
    FfiSetRequestHeaderFn,
};

type ObserverSlot = Rc<RefCell<Option<ReadyStateObserver>>>;

thread_local! {
    static OBSERVERS: RefCell<HashMap<u64, ObserverSlot>> = RefCell::new(HashMap::new());
    static NEXT_NATIVE_ID: Cell<u64> = const { Cell::new(1) };
}

#[derive(Clone, Copy)]
struct Callbacks {
    user_data: *mut c_void,
    create_native: FfiCreateNativeFn,
    open: FfiOpenFn,
    set_request_header: FfiSetRequestHeaderFn,
    send: FfiSendFn,
    abort: FfiAbortFn,
    release_native: Option<FfiReleaseNativeFn>,
}

/// `Host` implementation backed by an `FfiHost` function table.
pub struct FfiHostAdapter {
    callbacks: Callbacks,
    location: Option<String>,
    sets_referer_natively: bool,
}

impl FfiHostAdapter {
    /// Copy the function table. Returns `None` if a required function is
    /// missing.
    ///
    /// # Safety
    /// `host.location` must be null or a valid NUL-terminated string.
    pub(crate) unsafe fn from_ffi(host: &FfiHost) -> Option<Self> {
        let callbacks = Callbacks {
            user_data: host.user_data,
            create_native: host.create_native?,
            open: host.open?,
            set_request_header: host.set_request_header?,
            send: host.send?,
            abort: host.abort?,
            release_native: host.release_native,
        };
        let location = if host.location.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(host.location) }.to_string_lossy().into_owned())
        };
        Some(Self {
            callbacks,
            location,
            sets_referer_natively: host.sets_referer_natively,
        })
    }
}

impl Host for FfiHostAdapter {
    type Native = FfiNative;

    fn create_native(&self) -> Result<FfiNative, NativeError> {
        let id = NEXT_NATIVE_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        let code = (self.callbacks.create_native)(self.callbacks.user_data, id);
        if code != 0 {
            return Err(NativeError::new("create", format!("host returned {code}")));
        }
        let observer: ObserverSlot = Rc::new(RefCell::new(None));
        OBSERVERS.with(|observers| observers.borrow_mut().insert(id, observer.clone()));
        tracing::trace!(native_id = id, "native request created");
        Ok(FfiNative {
            id,
            callbacks: self.callbacks,
            observer,
        })
    }

    fn location(&self) -> Option<String> {
        self.location.clone()
    }

    fn sets_referer_natively(&self) -> bool {
        self.sets_referer_natively
    }
}

pub struct FfiNative {
    id: u64,
    callbacks: Callbacks,
    observer: ObserverSlot,
}

fn c_string(operation: &'static str, value: &str) -> Result<CString, NativeError> {
    CString::new(value).map_err(|_| NativeError::new(operation, "string contains NUL"))
}

fn check(operation: &'static str, code: i32) -> Result<(), NativeError> {
    match code {
        0 => Ok(()),
        code => Err(NativeError::new(operation, format!("host returned {code}"))),
    }
}

impl NativeRequest for FfiNative {
    fn open(
        &mut self,
        method: HttpMethod,
        url: &str,
        asynchronous: bool,
    ) -> Result<(), NativeError> {
        let method = c_string("open", method.as_str())?;
        let url = c_string("open", url)?;
        let code = (self.callbacks.open)(
            self.callbacks.user_data,
            self.id,
            method.as_ptr(),
            url.as_ptr(),
            asynchronous,
        );
        check("open", code)
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), NativeError> {
        let name = c_string("setRequestHeader", name)?;
        let value = c_string("setRequestHeader", value)?;
        let code = (self.callbacks.set_request_header)(
            self.callbacks.user_data,
            self.id,
            name.as_ptr(),
            value.as_ptr(),
        );
        check("setRequestHeader", code)
    }

    fn set_on_ready_state_change(&mut self, observer: ReadyStateObserver) {
        *self.observer.borrow_mut() = Some(observer);
    }

    fn send(&mut self, body: Option<&str>) -> Result<(), NativeError> {
        let body = body.map(|b| c_string("send", b)).transpose()?;
        let body_ptr = body.as_ref().map_or(std::ptr::null(), |b| b.as_ptr());
        let code = (self.callbacks.send)(self.callbacks.user_data, self.id, body_ptr);
        check("send", code)
    }

    fn abort(&mut self) {
        self.observer.borrow_mut().take();
        (self.callbacks.abort)(self.callbacks.user_data, self.id);
    }
}

impl Drop for FfiNative {
    fn drop(&mut self) {
        let _ = OBSERVERS.try_with(|observers| {
            if let Ok(mut observers) = observers.try_borrow_mut() {
                observers.remove(&self.id);
            }
        });
        if let Some(release) = self.callbacks.release_native {
            release(self.callbacks.user_data, self.id);
        }
        tracing::trace!(native_id = self.id, "native request released");
    }
}

/// Report a readiness change of native `native_id` to its request.
///
/// Returns `false` if no live native has that id.
pub(crate) fn deliver(native_id: u64, snapshot: &ReadinessSnapshot) -> bool {
    let slot = OBSERVERS.with(|observers| observers.borrow().get(&native_id).cloned());
    let Some(slot) = slot else {
        return false;
    };
    let observer = slot.borrow_mut().take();
    if let Some(mut observer) = observer {
        observer(snapshot);
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            *slot = Some(observer);
        }
    }
    true
}

/// Read a nullable C string, replacing invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn lossy_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}
