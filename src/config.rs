//! Client configuration.
//!
//! Settings come from a TOML file, then environment overrides:
//!
//! ```toml
//! base_url = "https://localhost:7040/api"
//! timeout_secs = 30
//! user_agent = "taskboard-client/0.1.0"
//! ```
//!
//! `TASKBOARD_API_URL` and `TASKBOARD_TIMEOUT_SECS` override the file.

use crate::error::{Result, TaskboardError};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const API_URL_ENV: &str = "TASKBOARD_API_URL";
pub const TIMEOUT_ENV: &str = "TASKBOARD_TIMEOUT_SECS";

const DEFAULT_BASE_URL: &str = "https://localhost:7040/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the board API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the REST API; resource paths are appended to it
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("taskboard-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| TaskboardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML config file; a missing file yields the defaults
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await.map_err(|e| {
            TaskboardError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Applies `TASKBOARD_API_URL` / `TASKBOARD_TIMEOUT_SECS`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(API_URL_ENV) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.timeout_secs = raw.trim().parse().map_err(|_| {
                TaskboardError::Config(format!("{} must be a whole number of seconds", TIMEOUT_ENV))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.api_root()?;
        if self.timeout_secs == 0 {
            return Err(TaskboardError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL parsed, with a trailing slash so relative joins append
    pub fn api_root(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| TaskboardError::Config(format!("invalid base_url '{}': {}", self.base_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(TaskboardError::Config(format!(
                "unsupported scheme '{}' in base_url",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://localhost:7040/api");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(r#"base_url = "http://boards.local/api""#).unwrap();
        assert_eq!(config.base_url, "http://boards.local/api");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_rejects_bad_scheme_and_zero_timeout() {
        assert!(ClientConfig::from_toml_str(r#"base_url = "ftp://boards.local""#).is_err());
        assert!(ClientConfig::from_toml_str("timeout_secs = 0").is_err());
    }

    #[test]
    fn test_api_root_has_trailing_slash() {
        let root = ClientConfig::new("http://boards.local/api").api_root().unwrap();
        assert_eq!(
            root.join("cards/ByColumn/3").unwrap().as_str(),
            "http://boards.local/api/cards/ByColumn/3"
        );
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (API_URL_ENV, "http://127.0.0.1:9000/api"),
            (TIMEOUT_ENV, "5"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9000/api");
        assert_eq!(config.timeout_secs, 5);

        let bad = ClientConfig::default().with_overrides(|key| {
            (key == TIMEOUT_ENV).then(|| "soon".to_string())
        });
        assert!(matches!(bad, Err(TaskboardError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("taskboard.toml");
        tokio::fs::write(&path, "base_url = \"http://localhost:5000/api\"\ntimeout_secs = 12\n")
            .await
            .unwrap();

        let config = ClientConfig::load(&path).await.unwrap();
        assert_eq!(config.base_url, "http://localhost:5000/api");
        assert_eq!(config.timeout_secs, 12);
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ClientConfig::load(temp_dir.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config, ClientConfig::default());
    }
}
