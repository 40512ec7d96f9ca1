//! Client configuration

use crate::error::{ClientError, Result};
use crate::session::FileSession;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the SleepWise API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Where the login credential is stored
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Load from `~/.config/sleepwise/config.json` (if present) and `SLEEPWISE_*` env vars
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        Self::load_from(path.as_deref())
    }

    /// Load from an optional JSON file, then environment overrides
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        let config = builder
            .add_source(config::Environment::with_prefix("SLEEPWISE"))
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let loaded: ClientConfig = config
            .try_deserialize()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Replace the base URL (command-line flag wins over file and env)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Parsed base URL
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(self.api_url.trim())
            .map_err(|e| ClientError::Config(format!("invalid API URL {:?}: {}", self.api_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::Config(format!(
                "unsupported URL scheme {:?}",
                other
            ))),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured session file, or the default location
    pub fn session_path(&self) -> Result<PathBuf> {
        match &self.session_file {
            Some(path) => Ok(path.clone()),
            None => FileSession::default_path(),
        }
    }

    fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("sleepwise").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_url": "https://api.sleepwise.test", "timeout_secs": 5, "session_file": "/tmp/s.json"}"#,
        )
        .unwrap();

        let config = ClientConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.api_url, "https://api.sleepwise.test");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.session_path().unwrap(), PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::load_from(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = ClientConfig::default().with_api_url("not a url");
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));

        let config = ClientConfig::default().with_api_url("ftp://example.com");
        assert!(config.validate().is_err());
    }
}
