//! Request handler module
//!
//! Dynamic handlers emulate the hosting platform's edge functions: each one
//! takes a fully-buffered request and produces a response. Handlers are
//! registered explicitly at startup under the route they serve.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;

use crate::http::Body;
use hyper::body::Bytes;
use hyper::{Request, Response};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

pub type HandlerResult = Result<Response<Body>, HandlerError>;
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Failures a handler reports instead of a response
///
/// The router turns these into a generic 500.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to build response: {0}")]
    Response(#[from] hyper::http::Error),
}

/// Request-in, response-out function served under a route
pub trait Handler: Send + Sync {
    fn call(&self, req: Request<Bytes>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Request<Bytes>) -> HandlerFuture {
        Box::pin(self(req))
    }
}

/// Strip leading/trailing slashes; the root path becomes `index`
pub fn normalize_path(path: &str) -> &str {
    match path.trim_matches('/') {
        "" => "index",
        trimmed => trimmed,
    }
}

/// Routes to handlers, keyed by normalized path
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    routes: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `route` (`/api/auth`, `api/auth` and
    /// `api/auth/` are the same route). Re-registering replaces.
    pub fn register(&mut self, route: &str, handler: impl Handler + 'static) -> &mut Self {
        self.register_shared(route, Arc::new(handler))
    }

    /// Register one handler instance under an additional route
    pub fn register_shared(&mut self, route: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.routes
            .insert(normalize_path(route).to_string(), handler);
        self
    }

    /// Handler for an already-normalized route
    pub fn resolve(&self, route: &str) -> Option<Arc<dyn Handler>> {
        self.routes.get(route).cloned()
    }

    pub fn routes(&self) -> Vec<&str> {
        let mut routes: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes
    }
}
