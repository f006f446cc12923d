//! Header rule sources
//!
//! Rules come from the platform deployment configuration (`vercel.json`).
//! Sources are read on every call so edits apply without a restart.

use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;

/// A single `{ key, value }` pair attached by a rule
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

/// Pattern-to-headers mapping
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    /// Regular expression tested against the request path
    pub source: String,
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
}

#[cfg(test)]
impl HeaderRule {
    pub fn new(source: &str, headers: &[(&str, &str)]) -> Self {
        Self {
            source: source.to_string(),
            headers: headers
                .iter()
                .map(|(key, value)| HeaderEntry {
                    key: (*key).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
        }
    }
}

/// The subset of the deployment configuration this server reads
#[derive(Debug, Deserialize, Default)]
struct PlatformConfig {
    #[serde(default)]
    headers: Vec<HeaderRule>,
}

#[derive(Debug, Error)]
pub enum HeaderConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type RulesFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<HeaderRule>, HeaderConfigError>> + Send + 'a>>;

/// Anything that can hand out the current list of header rules
pub trait HeaderRuleSource: Send + Sync {
    fn load_rules(&self) -> RulesFuture<'_>;
}

/// Reads rules from a JSON file with a top-level `headers` array
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
}

impl FileRuleSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl HeaderRuleSource for FileRuleSource {
    fn load_rules(&self) -> RulesFuture<'_> {
        Box::pin(async move {
            let raw = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| HeaderConfigError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            let parsed: PlatformConfig =
                serde_json::from_str(&raw).map_err(|source| HeaderConfigError::Parse {
                    path: self.path.clone(),
                    source,
                })?;
            Ok(parsed.headers)
        })
    }
}

/// Fixed in-memory rules
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticRuleSource {
    rules: Vec<HeaderRule>,
}

#[cfg(test)]
impl StaticRuleSource {
    pub const fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }
}

#[cfg(test)]
impl HeaderRuleSource for StaticRuleSource {
    fn load_rules(&self) -> RulesFuture<'_> {
        Box::pin(std::future::ready(Ok(self.rules.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_source_reads_headers_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vercel.json");
        std::fs::write(
            &path,
            r#"{
                "rewrites": [],
                "headers": [
                    { "source": "/api/(.*)", "headers": [{ "key": "X-Api", "value": "1" }] }
                ]
            }"#,
        )
        .unwrap();

        let rules = FileRuleSource::new(&path).load_rules().await.unwrap();
        assert_eq!(rules, vec![HeaderRule::new("/api/(.*)", &[("X-Api", "1")])]);
    }

    #[tokio::test]
    async fn test_file_source_without_headers_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vercel.json");
        std::fs::write(&path, r#"{ "cleanUrls": true }"#).unwrap();

        assert!(FileRuleSource::new(&path).load_rules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FileRuleSource::new(dir.path().join("nope.json"));
        assert!(matches!(
            missing.load_rules().await,
            Err(HeaderConfigError::Io { .. })
        ));

        let path = dir.path().join("vercel.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FileRuleSource::new(&path).load_rules().await,
            Err(HeaderConfigError::Parse { .. })
        ));
    }
}
