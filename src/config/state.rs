// Application state module
// Holds the immutable per-process pieces every request reads

use super::types::Config;
use crate::api;
use crate::handler::HandlerRegistry;
use crate::headers::{FileRuleSource, HeaderResolver};

/// Application state
pub struct AppState {
    pub config: Config,
    pub headers: HeaderResolver,
    pub handlers: HandlerRegistry,
}

impl AppState {
    /// Build the state the server runs with: header rules read from the
    /// configured file, the project's API handlers registered
    pub fn new(config: Config) -> Self {
        let headers = HeaderResolver::new(FileRuleSource::new(&config.project.headers_file));
        let handlers = api::registry(&config.oauth);
        Self::with_parts(config, headers, handlers)
    }

    pub fn with_parts(config: Config, headers: HeaderResolver, handlers: HandlerRegistry) -> Self {
        Self {
            config,
            headers,
            handlers,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::StaticRuleSource;

    #[test]
    fn test_access_log_follows_config() {
        let state = |enabled: bool| {
            let mut config = Config::default();
            config.logging.access_log = enabled;
            AppState::with_parts(
                config,
                HeaderResolver::new(StaticRuleSource::default()),
                HandlerRegistry::new(),
            )
        };
        assert!(state(true).access_log_enabled());
        assert!(!state(false).access_log_enabled());
    }
}
