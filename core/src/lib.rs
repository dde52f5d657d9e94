//! Lifecycle wrapper around a host-native asynchronous HTTP request.
//!
//! # Overview
//! A `Request` is built from a URL, a method and a content type, optionally
//! configured (dispatch mode, body, success and error handlers), then sent
//! exactly once through a native request handle obtained from a `Host`. The
//! host's network stack reports readiness changes back; on completion
//! exactly one handler fires and the request lets go of the native handle.
//! Disposing an in-flight request aborts it.
//!
//! # Design
//! - The core performs no I/O (host-does-IO pattern): `NativeRequest` and
//!   `Host` are the seam to whatever runtime owns the transport.
//! - Single-threaded and cooperative. `Request` is `!Send`; observers hold
//!   weak references so hosts cannot keep requests alive.
//! - Every request carries cache-busting and no-cache headers; responses
//!   are classified by status code alone.
//! - `testing` ships a recording double of the native primitive.

pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod native;
pub mod request;
pub mod testing;

pub use config::RequestConfig;
pub use error::{NativeError, RequestError};
pub use headers::{parse_response_headers, HeaderNamePolicy};
pub use http::{is_success_status, HttpMethod, HttpResponse, ReadyState, ResponseHeaders};
pub use native::{Host, NativeRequest, NativeResponse, ReadinessSnapshot, ReadyStateObserver};
pub use request::{ErrorHandler, Request, RequestState, SuccessHandler};
