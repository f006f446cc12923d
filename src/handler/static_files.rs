//! Static file serving module
//!
//! Resolves a normalized route to a file under the static root and builds
//! the response for it.

use crate::http::{self, cache, mime, Body};
use crate::logger;
use hyper::body::Bytes;
use hyper::header::IF_NONE_MATCH;
use hyper::{Method, Request, Response, StatusCode};
use std::path::{Path, PathBuf};
use tokio::fs;

/// First existing regular file among `<root>/<route>` and `<root>/<route>.html`
///
/// Candidates that resolve outside `root` are never returned.
pub async fn find_static_file(root: &Path, route: &str) -> Option<PathBuf> {
    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{}': {e}",
                root.display()
            ));
            return None;
        }
    };

    for candidate in [root.join(route), root.join(format!("{route}.html"))] {
        // Missing candidates are the common case, not worth logging
        let Ok(canonical) = fs::canonicalize(&candidate).await else {
            continue;
        };
        if !canonical.starts_with(&root_canonical) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {route} -> {}",
                canonical.display()
            ));
            continue;
        }
        if fs::metadata(&canonical).await.is_ok_and(|m| m.is_file()) {
            return Some(canonical);
        }
    }
    None
}

/// Serve a resolved file, answering conditional and `HEAD` requests
pub async fn serve_file(req: &Request<Bytes>, file_path: &Path) -> Response<Body> {
    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return http::build_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            );
        }
    };

    let etag = cache::generate_etag(&content);
    let if_none_match = req
        .headers()
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if cache::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
    http::response::build_static_response(
        Bytes::from(content),
        content_type,
        &etag,
        req.method() == Method::HEAD,
    )
}
