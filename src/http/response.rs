//! HTTP response building module
//!
//! Error bodies are always `{"error": <message>}` JSON.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use hyper::{Response, StatusCode};
use serde_json::Value;

/// Body type used for every response the dev server produces
pub type Body = Full<Bytes>;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Static assets are revalidated on every load so edits show up immediately
const STATIC_CACHE_CONTROL: &str = "no-cache";

/// Build a JSON response with the given status
pub fn build_json_response(status: StatusCode, value: &Value) -> Response<Body> {
    let body = value.to_string();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .header(CONTENT_LENGTH, body.len())
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            fallback(status)
        })
}

/// Build `{"error": message}` with the given status
pub fn build_error_response(status: StatusCode, message: &str) -> Response<Body> {
    build_json_response(status, &serde_json::json!({ "error": message }))
}

/// Build 404 Not Found response
pub fn build_not_found_response() -> Response<Body> {
    build_error_response(StatusCode::NOT_FOUND, "not found")
}

/// Build preflight response; the router layers the CORS headers on top
pub fn build_preflight_response() -> Response<Body> {
    fallback(StatusCode::NO_CONTENT)
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, STATIC_CACHE_CONTROL)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            fallback(StatusCode::NOT_MODIFIED)
        })
}

/// Build 200 response for a static file
pub fn build_static_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    is_head: bool,
) -> Response<Body> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, STATIC_CACHE_CONTROL)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            fallback(StatusCode::OK)
        })
}

/// Empty response carrying only a status
fn fallback(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
