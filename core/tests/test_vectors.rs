//! Verify header parsing and status routing against JSON test vectors stored
//! in `test-vectors/`.
//!
//! Status vectors are checked end-to-end: each case drives a `Request`
//! through the recording double and observes which handler fires.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use nativereq_core::testing::MockHost;
use nativereq_core::{
    is_success_status, parse_response_headers, HeaderNamePolicy, HttpMethod, ReadyState, Request,
};

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

#[test]
fn header_test_vectors() {
    let raw = include_str!("../../test-vectors/headers.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let policy: HeaderNamePolicy = serde_json::from_value(case["policy"].clone()).unwrap();
        let expected: HashMap<String, String> =
            serde_json::from_value(case["expected"].clone()).unwrap();

        let parsed = parse_response_headers(case["raw"].as_str().unwrap(), policy);
        assert_eq!(parsed, expected, "{name}");
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn status_test_vectors() {
    let raw = include_str!("../../test-vectors/status.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let status = case["status"].as_u64().unwrap() as u16;
        let expected = case["handler"].as_str().unwrap();

        let host = MockHost::new();
        let request =
            Request::new(host.clone(), "http://127.0.0.1/", HttpMethod::Post, "text/plain");
        let fired: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let on_success = fired.clone();
        request
            .set_handle_success(move |_, _, _| on_success.borrow_mut().push("success"))
            .unwrap();
        let on_error = fired.clone();
        request
            .set_handle_error(move |_, _| on_error.borrow_mut().push("error"))
            .unwrap();
        request.send().unwrap();

        let native = host.last_native().unwrap();
        native.set_status(status);
        native.set_ready_state(ReadyState::Done);
        native.fire_ready_state_change();

        assert_eq!(*fired.borrow(), vec![expected], "status {status}");
        assert_eq!(is_success_status(status), expected == "success", "status {status}");
    }
}
