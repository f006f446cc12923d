//! HTTP protocol layer module
//!
//! Response builders, header layering, cache validators and MIME detection
//! shared by the router, static file serving and the API handlers.

pub mod cache;
pub mod cors;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use cors::{apply_cors, merge_headers};
pub use response::{
    build_304_response, build_error_response, build_json_response, build_not_found_response,
    build_preflight_response, Body,
};
