//! `api/index`: liveness endpoint for the extension's backend

use crate::handler::HandlerResult;
use crate::http::response::JSON_CONTENT_TYPE;
use crate::http::Body;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Response, StatusCode};

pub async fn hello(_req: Request<Bytes>) -> HandlerResult {
    let body = serde_json::json!({ "message": "hello darkness my old friend" });
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Body::from(body.to_string()))?)
}
