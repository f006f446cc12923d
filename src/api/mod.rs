//! Project API handlers
//!
//! The serverless endpoints a generated extension project ships with,
//! registered under the routes the hosting platform would expose them on.

pub mod auth;
pub mod index;

use crate::config::OAuthConfig;
use crate::handler::{Handler, HandlerRegistry};
use std::sync::Arc;

pub use auth::AuthHandler;

/// Registry with every project handler
///
/// `api/index` is also reachable as `api`, matching how the platform maps a
/// directory index.
pub fn registry(oauth: &OAuthConfig) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("api/auth", AuthHandler::new(oauth.clone()));

    let hello: Arc<dyn Handler> = Arc::new(index::hello);
    registry
        .register_shared("api/index", Arc::clone(&hello))
        .register_shared("api", hello);
    registry
}
