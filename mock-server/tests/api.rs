use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, RecordedRequest};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn post(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "text/plain; charset=UTF-8")
        .header(http::header::PRAGMA, "no-cache")
        .header(http::header::CACHE_CONTROL, "no-cache")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_returns_posted_body() {
    let resp = app().oneshot(post("/echo?nocache=1", "foobar")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-echo"], "1");
    assert_eq!(resp.headers()["x-echo-method"], "POST");
    assert_eq!(body_bytes(resp).await, "foobar");
}

#[tokio::test]
async fn echo_get_returns_query() {
    let resp = app().oneshot(get("/echo?a=1&nocache=2")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "a=1&nocache=2");
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(post("/status/404", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(resp).await, "status 404");
}

#[tokio::test]
async fn status_rejects_non_numeric_code() {
    let resp = app().oneshot(get("/status/teapot")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- last ---

#[tokio::test]
async fn last_is_not_found_before_any_request() {
    let resp = app().oneshot(get("/last")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn last_reports_previous_request() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(post("/echo?nocache=abc", "payload"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/last"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let recorded: RecordedRequest = body_json(resp).await;
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path, "/echo");
    assert_eq!(recorded.query.as_deref(), Some("nocache=abc"));
    assert_eq!(recorded.body, "payload");
    assert_eq!(recorded.headers["pragma"], "no-cache");
    assert_eq!(recorded.headers["cache-control"], "no-cache");
    assert_eq!(recorded.headers["content-type"], "text/plain; charset=UTF-8");

    // `/last` itself is not recorded
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/last"))
        .await
        .unwrap();
    let again: RecordedRequest = body_json(resp).await;
    assert_eq!(again.id, recorded.id);
}
