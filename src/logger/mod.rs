//! Logger module
//!
//! Thin helpers over `tracing` for the dev server:
//! - Subscriber setup from configuration
//! - Server lifecycle logging
//! - Access logging with multiple formats (emitted on the `access` target)

mod format;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `logging.level`. Should be called once at
/// application startup.
pub fn init(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        address = %addr,
        static_dir = %config.project.static_dir.display(),
        headers_file = %config.project.headers_file.display(),
        "Dev server listening on http://{addr}"
    );
    if let Some(workers) = config.server.workers {
        tracing::info!(workers, "Using configured worker threads");
    }
    if config.oauth.client_id.is_none() || config.oauth.client_secret.is_none() {
        tracing::warn!(
            "GITHUB_CLIENT_ID/GITHUB_CLIENT_SECRET not set; /api/auth code exchange will fail"
        );
    }
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!(peer = %peer_addr, "Connection accepted");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_handler_error(route: &str, err: &impl std::fmt::Display) {
    tracing::error!(route, "Handler failed: {err}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_debug(message: &str) {
    tracing::debug!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: "access", "{}", entry.format(format));
}

pub fn log_shutdown(active_connections: usize) {
    tracing::info!(active_connections, "Shutting down");
}
