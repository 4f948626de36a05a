//! Configuration management for ITS accessors
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (ITS_*)
//! 3. Config file (~/.config/its/config.toml)
//! 4. Default values

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, UnknownNamePolicy};

/// Supported tracker backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    #[default]
    Redmine,
}

impl std::fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerKind::Redmine => write!(f, "redmine"),
        }
    }
}

/// Tracker connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Which backend to talk to
    pub kind: TrackerKind,

    /// Base URL of the tracker
    pub url: Option<String>,

    /// Project identifier
    pub project: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Validate TLS certificates. Off by default because trackers are
    /// commonly served with self-signed certificates.
    pub verify_certificates: bool,

    /// Handling of assignee/version/priority names missing from the tracker
    pub unknown_names: UnknownNamePolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: TrackerKind::default(),
            url: None,
            project: None,
            timeout: Duration::from_secs(30),
            verify_certificates: false,
            unknown_names: UnknownNamePolicy::default(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Tracker configuration
    pub tracker: TrackerConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/its/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("its").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - ITS_URL: Tracker base URL
    /// - ITS_PROJECT: Project identifier
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("ITS_URL") {
            self.tracker.url = Some(url);
        }

        if let Ok(project) = std::env::var("ITS_PROJECT") {
            self.tracker.project = Some(project);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, url: Option<String>, project: Option<String>) -> Self {
        if let Some(url) = url {
            self.tracker.url = Some(url);
        }

        if let Some(project) = project {
            self.tracker.project = Some(project);
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(url: Option<String>, project: Option<String>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(url, project))
    }

    /// Tracker URL, or an error naming how to set it
    pub fn require_url(&self) -> Result<&str> {
        self.tracker.url.as_deref().ok_or_else(|| {
            Error::Config(
                "Tracker URL not set. Use --url, ITS_URL, or [tracker].url in config.toml"
                    .to_string(),
            )
        })
    }

    /// Project identifier, or an error naming how to set it
    pub fn require_project(&self) -> Result<&str> {
        self.tracker.project.as_deref().ok_or_else(|| {
            Error::Config(
                "Project not set. Use --project, ITS_PROJECT, or [tracker].project in config.toml"
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracker.kind, TrackerKind::Redmine);
        assert!(config.tracker.url.is_none());
        assert_eq!(config.tracker.timeout, Duration::from_secs(30));
        assert!(!config.tracker.verify_certificates);
        assert_eq!(config.tracker.unknown_names, UnknownNamePolicy::Clear);
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(
            Some("https://redmine.example.com".to_string()),
            Some("demo".to_string()),
        );

        assert_eq!(config.require_url().unwrap(), "https://redmine.example.com");
        assert_eq!(config.require_project().unwrap(), "demo");
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let err = Config::default().require_url().unwrap_err();
        assert!(err.to_string().contains("ITS_URL"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[tracker]
kind = "redmine"
url = "https://redmine.example.com"
project = "demo"
timeout = "5s"
verify_certificates = true
unknown_names = "reject"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.tracker.url.as_deref(), Some("https://redmine.example.com"));
        assert_eq!(config.tracker.project.as_deref(), Some("demo"));
        assert_eq!(config.tracker.timeout, Duration::from_secs(5));
        assert!(config.tracker.verify_certificates);
        assert_eq!(config.tracker.unknown_names, UnknownNamePolicy::Reject);
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[tracker]
project = "demo"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        // everything else should use defaults
        assert_eq!(config.tracker.project.as_deref(), Some("demo"));
        assert_eq!(config.tracker.timeout, Duration::from_secs(30));
        assert_eq!(config.tracker.kind, TrackerKind::Redmine);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[tracker]\nurl = \"http://localhost:3000\"").unwrap();

        let config = Config::load_from_file(&file.path().to_path_buf()).unwrap();
        assert_eq!(config.tracker.url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_load_from_file_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[tracker\nurl =").unwrap();

        let err = Config::load_from_file(&file.path().to_path_buf()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
