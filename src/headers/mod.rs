//! Header resolver
//!
//! Computes the extra response headers the platform configuration attaches
//! to a request path. Rules are re-read on every call and a broken or
//! missing configuration yields no headers rather than a failed request.

mod source;

pub use source::{
    FileRuleSource, HeaderConfigError, HeaderEntry, HeaderRule, HeaderRuleSource,
};
#[cfg(test)]
pub use source::StaticRuleSource;

use crate::logger;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use regex::Regex;
use std::sync::Arc;

/// Resolves header rules for request paths
#[derive(Clone)]
pub struct HeaderResolver {
    source: Arc<dyn HeaderRuleSource>,
}

impl HeaderResolver {
    pub fn new(source: impl HeaderRuleSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Headers for every rule whose pattern matches `path`, merged in rule
    /// order. A later rule overwrites an earlier one for the same key.
    pub async fn resolve(&self, path: &str) -> HeaderMap {
        let rules = match self.source.load_rules().await {
            Ok(rules) => rules,
            Err(HeaderConfigError::Io { path, source })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                logger::log_debug(&format!("No header configuration at {}", path.display()));
                return HeaderMap::new();
            }
            Err(e) => {
                logger::log_warning(&format!("Ignoring header configuration: {e}"));
                return HeaderMap::new();
            }
        };

        let mut headers = HeaderMap::new();
        for rule in rules.iter().filter(|rule| rule_matches(rule, path)) {
            for entry in &rule.headers {
                match parse_entry(entry) {
                    Some((name, value)) => {
                        headers.insert(name, value);
                    }
                    None => logger::log_warning(&format!(
                        "Skipping invalid header '{}' in rule '{}'",
                        entry.key, rule.source
                    )),
                }
            }
        }
        headers
    }
}

fn rule_matches(rule: &HeaderRule, path: &str) -> bool {
    match Regex::new(&rule.source) {
        Ok(re) => re.is_match(path),
        Err(e) => {
            logger::log_warning(&format!(
                "Skipping header rule with invalid pattern '{}': {e}",
                rule.source
            ));
            false
        }
    }
}

fn parse_entry(entry: &HeaderEntry) -> Option<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(entry.key.as_bytes()).ok()?;
    let value = HeaderValue::from_str(&entry.value).ok()?;
    Some((name, value))
}
