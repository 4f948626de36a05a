//! Redmine API key storage
//!
//! Redmine authenticates REST calls with a per-user access key, sent in the
//! `X-Redmine-API-Key` header. The key grants everything its owner can do,
//! so it is kept out of `config.toml` in `~/.config/its/secrets.toml`, which
//! must be readable by the owner only (0600 on Unix).
//!
//! `REDMINE_API_KEY` takes precedence over the file so CI jobs can inject a
//! bot account's key without touching disk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable holding the Redmine API key
pub const REDMINE_API_KEY_ENV: &str = "REDMINE_API_KEY";

/// Redmine generates keys as 40 hex digits
const API_KEY_LEN: usize = 40;

/// True when `key` has the shape of a key generated by Redmine
///
/// Only used to warn early: a login password pasted by mistake otherwise
/// surfaces as a 401 on the first request.
pub fn looks_like_api_key(key: &str) -> bool {
    key.len() == API_KEY_LEN && key.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Contents of the secrets file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    pub redmine: RedmineSecrets,
}

/// `[redmine]` table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RedmineSecrets {
    /// Access key shown under "My account > API access key"
    pub api_key: Option<String>,
}

impl Secrets {
    /// Read the secrets file at its default path; no file means no key
    pub fn load() -> Result<Self> {
        match Self::default_secrets_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Read a secrets file, refusing one that group or others can access
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}; it holds a Redmine API key. \
                     Run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }

            debug!(path = %path.display(), mode = format!("{:o}", mode & 0o777), "Secrets file permissions OK");
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        if let Some(ref mut key) = secrets.redmine.api_key {
            *key = key.trim().to_string();
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/its/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("its").join("secrets.toml"))
    }

    /// Redmine API key, environment first, then the secrets file
    ///
    /// Blank values count as unset. A key that does not look like one Redmine
    /// generated is still returned, with a warning.
    pub fn redmine_api_key(&self) -> Option<String> {
        let (source, key) = match env_api_key() {
            Some(key) => (REDMINE_API_KEY_ENV, key),
            None => ("secrets file", self.file_api_key()?),
        };

        if looks_like_api_key(&key) {
            debug!(source, "Using Redmine API key");
        } else {
            warn!(
                source,
                len = key.len(),
                "Redmine API key is not {} hex digits; requests will likely be rejected",
                API_KEY_LEN
            );
        }
        Some(key)
    }

    fn file_api_key(&self) -> Option<String> {
        self.redmine
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    /// Create a template secrets file at the default location
    ///
    /// Creates parent directories if needed and sets secure permissions
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;
        Self::create_template_at(&path)?;
        Ok(path)
    }

    /// Create a template secrets file at `path`, refusing to overwrite
    pub fn create_template_at(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }

        let template = r#"# its: Redmine credentials
#
# The key below acts as your Redmine account. Keep this file private
# (chmod 600); `its` refuses to read it otherwise.
#
# Where to find the key:
#   Redmine > My account > API access key > Show
# If that panel is missing, an administrator must enable
#   Administration > Settings > API > Enable REST web service
#
# REDMINE_API_KEY in the environment overrides this value.

[redmine]
api_key = ""
"#;

        std::fs::write(path, template).map_err(Error::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms).map_err(Error::Io)?;
        }

        warn!(path = %path.display(), "Created secrets template; paste your Redmine API key into it");

        Ok(())
    }
}

fn env_api_key() -> Option<String> {
    std::env::var(REDMINE_API_KEY_ENV)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
