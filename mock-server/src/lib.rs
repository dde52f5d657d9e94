use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// A request as the server saw it, reported by `GET /last`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordedRequest {
    pub id: Uuid,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Recorder = Arc<RwLock<Option<RecordedRequest>>>;

pub fn app() -> Router {
    let recorder: Recorder = Arc::new(RwLock::new(None));
    Router::new()
        .route("/echo", get(echo).post(echo))
        .route("/status/{code}", any(status))
        .layer(middleware::from_fn_with_state(recorder.clone(), record))
        .route("/last", get(last))
        .with_state(recorder)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

/// Store every routed request except `/last` itself.
async fn record(State(recorder): State<Recorder>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let recorded = RecordedRequest {
        id: Uuid::new_v4(),
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: header_map(&parts.headers),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    };
    tracing::debug!(method = %recorded.method, path = %recorded.path, "recorded request");
    *recorder.write().await = Some(recorded);
    next.run(Request::from_parts(parts, bytes.into())).await
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

async fn echo(method: Method, uri: Uri, body: Bytes) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("x-echo"), HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("x-echo-method"),
        HeaderValue::from_str(method.as_str()).unwrap_or(HeaderValue::from_static("?")),
    );
    let body = if method == Method::GET {
        uri.query().unwrap_or_default().to_string()
    } else {
        String::from_utf8_lossy(&body).into_owned()
    };
    (StatusCode::OK, headers, body)
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn last(State(recorder): State<Recorder>) -> Result<Json<RecordedRequest>, StatusCode> {
    recorder.read().await.clone().map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_request_serializes_to_json() {
        let recorded = RecordedRequest {
            id: Uuid::nil(),
            method: "POST".to_string(),
            path: "/echo".to_string(),
            query: Some("nocache=1".to_string()),
            headers: BTreeMap::from([("pragma".to_string(), "no-cache".to_string())]),
            body: "foobar".to_string(),
        };
        let json = serde_json::to_value(&recorded).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["query"], "nocache=1");
        assert_eq!(json["headers"]["pragma"], "no-cache");
        assert_eq!(json["body"], "foobar");
    }

    #[test]
    fn recorded_request_without_query() {
        let recorded: RecordedRequest = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000000","method":"GET","path":"/echo","query":null,"headers":{},"body":""}"#,
        )
        .unwrap();
        assert!(recorded.query.is_none());
        assert!(recorded.headers.is_empty());
    }

    #[test]
    fn header_map_skips_non_utf8_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ok", HeaderValue::from_static("yes"));
        headers.insert("x-bad", HeaderValue::from_bytes(&[0xff]).unwrap());
        let map = header_map(&headers);
        assert_eq!(map.get("x-ok").map(String::as_str), Some("yes"));
        assert!(!map.contains_key("x-bad"));
    }
}
