//! Cross-origin headers and header layering
//!
//! Every response leaving the dev server carries the same permissive CORS
//! headers, applied last so they win over handler and rule headers.

use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "OPTIONS, POST";
pub const ALLOW_HEADERS: &str = "Content-Type";

/// Overlay `layer` onto `target`; keys present in `layer` replace existing values
pub fn merge_headers(target: &mut HeaderMap, layer: &HeaderMap) {
    for (name, value) in layer {
        target.insert(name.clone(), value.clone());
    }
}

/// Overlay the fixed cross-origin headers onto `target`
pub fn apply_cors(target: &mut HeaderMap) {
    target.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    target.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    target.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}
