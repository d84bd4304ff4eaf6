use crate::state::AppState;
use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// JSON bodies up to this size are logged verbatim at debug level.
const MAX_LOGGED_BODY: usize = 1024;

/// Assign (or propagate) an `x-trace-id`, wrap the request in a span, and
/// log its start, status and latency.
pub async fn trace_middleware(
    State(_state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        info!("→ request started");
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let body = log_body("request", &parts.headers, body).await;
        let mut req = Request::from_parts(parts, body);
        if let Some(value) = header_value.clone() {
            req.headers_mut().insert(X_TRACE_ID, value);
        }

        let response = next.run(req).await;

        let (parts, body) = response.into_parts();
        let body = log_body("response", &parts.headers, body).await;
        let mut response = Response::from_parts(parts, body);
        if let Some(value) = header_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

/// Only small JSON bodies with a known length are buffered for logging.
fn loggable(headers: &header::HeaderMap, body: &Body) -> bool {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    is_json
        && body
            .size_hint()
            .upper()
            .is_some_and(|n| n <= MAX_LOGGED_BODY as u64)
}

/// Log a body at debug level when [`loggable`], returning a body with the
/// same content. Anything else is passed through without being read.
async fn log_body(direction: &str, headers: &header::HeaderMap, body: Body) -> Body {
    if !loggable(headers, &body) {
        let hint = body.size_hint();
        if hint.upper() != Some(0) {
            debug!(direction, size = ?hint.upper(), "body not logged");
        }
        return body;
    }

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(direction, error = %e, "failed to buffer body");
            return Body::empty();
        }
    };
    if let Ok(text) = std::str::from_utf8(&bytes) {
        debug!(direction, body = %text, "body");
    }
    Body::from(bytes)
}

#[cfg(test)]
mod test {
    use super::*;

    fn json_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn only_small_json_bodies_are_logged() {
        assert!(loggable(&json_headers(), &Body::from(r#"{"a":1}"#)));
        assert!(!loggable(&json_headers(), &Body::from("x".repeat(MAX_LOGGED_BODY + 1))));
        assert!(!loggable(&header::HeaderMap::new(), &Body::from("plain")));
    }

    #[tokio::test]
    async fn large_bodies_pass_through_unchanged() {
        let payload = "y".repeat(MAX_LOGGED_BODY * 4);
        let body = log_body("request", &json_headers(), Body::from(payload.clone())).await;
        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(bytes, payload.as_bytes());
    }

    #[tokio::test]
    async fn logged_bodies_keep_their_content() {
        let body = log_body("response", &json_headers(), Body::from(r#"{"ok":true}"#)).await;
        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(bytes, r#"{"ok":true}"#.as_bytes());
    }
}
