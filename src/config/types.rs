// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub project: ProjectConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub oauth: OAuthConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            workers: None,
        }
    }
}

/// Where the generated extension project lives on disk
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory static assets are served from
    pub static_dir: PathBuf,
    /// Platform deployment configuration holding the header rules
    pub headers_file: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("."),
            headers_file: PathBuf::from("vercel.json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: true,
            access_log_format: "combined".to_string(),
        }
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Per-connection deadline in seconds
    pub connection_timeout: u64,
    pub max_connections: Option<u64>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            connection_timeout: 60,
            max_connections: None,
        }
    }
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub max_body_size: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10_485_760, // 10MB
        }
    }
}

/// OAuth provider settings used by the `api/auth` handler
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OAuthConfig {
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Pre-provisioned token returned for `GET ?saved=...`
    pub token: Option<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            client_id: None,
            client_secret: None,
            token: None,
        }
    }
}
