// Configuration module entry point
// Manages application configuration and shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, OAuthConfig};

/// Environment variables the OAuth handler reads, mapped to their config keys
const OAUTH_ENV: [(&str, &str); 3] = [
    ("oauth.client_id", "GITHUB_CLIENT_ID"),
    ("oauth.client_secret", "GITHUB_CLIENT_SECRET"),
    ("oauth.token", "GITHUB_TOKEN"),
];

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "cextup.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("CEXTUP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, var) in OAUTH_ENV {
            let value = std::env::var(var).ok().filter(|v| !v.is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
