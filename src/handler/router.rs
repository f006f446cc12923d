//! Request routing dispatch module
//!
//! Entry point for HTTP request processing. Mirrors the hosting platform:
//! preflight short-circuit, registered handlers first, static files second,
//! then a JSON 404. Every response gets the header-rule matches for its path
//! and the fixed cross-origin headers layered on top.

use crate::config::AppState;
use crate::handler::{normalize_path, static_files, Handler};
use crate::http::{self, Body};
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body as HttpBody, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// How a normalized route is served
pub enum Resolution {
    Dynamic(Arc<dyn Handler>),
    Static(PathBuf),
    NotFound,
}

/// A routed response and which path produced it, for the access log
pub struct Routed {
    pub response: Response<Body>,
    pub served_by: &'static str,
}

impl Routed {
    fn new(response: Response<Body>, served_by: &'static str) -> Self {
        Self {
            response,
            served_by,
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: Option<SocketAddr>,
) -> Result<Response<Body>, Infallible>
where
    B: HttpBody<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let mut entry = state
        .access_log_enabled()
        .then(|| AccessLogEntry::from_parts(peer, &parts));

    let buffered = read_body(&parts.headers, body, state.config.http.max_body_size).await;
    let Routed {
        response,
        served_by,
    } = match buffered {
        Ok(bytes) => route(Request::from_parts(parts, bytes), &state).await,
        Err(response) => {
            let rule_headers = state.headers.resolve(parts.uri.path()).await;
            Routed::new(finish(response, &rule_headers), "rejected")
        }
    };

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(body_size(&response)).unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        entry.served_by = served_by;
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Where a normalized route would be served from, without serving it
pub async fn resolve(route: &str, state: &AppState) -> Resolution {
    if let Some(handler) = state.handlers.resolve(route) {
        return Resolution::Dynamic(handler);
    }
    match static_files::find_static_file(&state.config.project.static_dir, route).await {
        Some(file) => Resolution::Static(file),
        None => Resolution::NotFound,
    }
}

/// Route a buffered request to a handler, a static file or a 404
pub async fn route(req: Request<Bytes>, state: &AppState) -> Routed {
    let path = req.uri().path().to_string();
    let rule_headers = state.headers.resolve(&path).await;

    // 1. CORS preflight never reaches handlers or the filesystem
    if req.method() == Method::OPTIONS {
        return Routed::new(
            finish(http::build_preflight_response(), &rule_headers),
            "preflight",
        );
    }

    // 2. Registered handler, then static file
    let route = normalize_path(&path);
    let (response, served_by) = match resolve(route, state).await {
        Resolution::Dynamic(handler) => match handler.call(req).await {
            Ok(response) => (response, "handler"),
            Err(e) => {
                logger::log_handler_error(route, &e);
                (
                    http::build_error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error",
                    ),
                    "handler_error",
                )
            }
        },
        Resolution::Static(file) => (static_files::serve_file(&req, &file).await, "static"),
        Resolution::NotFound => (http::build_not_found_response(), "not_found"),
    };

    Routed::new(finish(response, &rule_headers), served_by)
}

/// Layer header-rule matches and then the CORS headers over `response`
fn finish(mut response: Response<Body>, rule_headers: &HeaderMap) -> Response<Body> {
    let headers = response.headers_mut();
    http::merge_headers(headers, rule_headers);
    http::apply_cors(headers);
    response
}

/// Bytes in a buffered response body
fn body_size(response: &Response<Body>) -> u64 {
    response.body().size_hint().exact().unwrap_or(0)
}

/// Buffer the request body, enforcing `max_body_size`
async fn read_body<B>(
    headers: &HeaderMap,
    body: B,
    max_body_size: u64,
) -> Result<Bytes, Response<Body>>
where
    B: HttpBody<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    if let Some(resp) = check_content_length(headers, max_body_size) {
        return Err(resp);
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeded {max_body_size} bytes"));
            Err(payload_too_large())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(http::build_error_response(StatusCode::BAD_REQUEST, "bad request"))
        }
    }
}

/// Reject early when the declared Content-Length is already too large
fn check_content_length(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Body>> {
    let size_str = headers.get(CONTENT_LENGTH)?.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(payload_too_large())
        }
        Ok(_) => None,
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
    }
}

fn payload_too_large() -> Response<Body> {
    http::build_error_response(StatusCode::PAYLOAD_TOO_LARGE, "payload too large")
}
