//! Application configuration management.
//!
//! This module handles loading and saving the console configuration, which
//! includes the identity service location, session policy, and the last
//! identifier used to sign in.
//!
//! Configuration is stored at `~/.config/einventory/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "einventory";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the identity service base URL
pub const API_URL_ENV: &str = "EINVENTORY_API_URL";

/// Environment variable pre-filling the login identifier
pub const USERNAME_ENV: &str = "EINVENTORY_USERNAME";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Minutes without input before the session is closed.
const DEFAULT_INACTIVITY_MINUTES: u64 = 5;

/// Minimum accepted password length on the login form.
const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the session token is kept between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    /// `session.json` in the cache directory
    #[default]
    File,
    /// OS credential store
    Keyring,
}

/// Paths of the identity service calls, relative to `api_base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub validate_token: String,
    pub profile: String,
    pub sites: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            validate_token: "/validate-token".to_string(),
            profile: "/protected-data".to_string(),
            sites: "/sites".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub endpoints: Endpoints,
    pub inactivity_minutes: u64,
    pub min_password_length: usize,
    pub request_timeout_secs: u64,
    pub token_backend: TokenBackend,
    pub last_identifier: Option<String>,
    /// Base URL from the environment for this run only; never saved.
    #[serde(skip)]
    api_base_url_override: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            endpoints: Endpoints::default(),
            inactivity_minutes: DEFAULT_INACTIVITY_MINUTES,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            token_backend: TokenBackend::default(),
            last_identifier: None,
            api_base_url_override: None,
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist,
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        self.override_api_base_url(std::env::var(API_URL_ENV).ok());
    }

    /// Point this run at another service without touching the saved value.
    pub fn override_api_base_url(&mut self, url: Option<String>) {
        self.api_base_url_override = url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
    }

    /// Base URL in effect: the override if set, else the configured one.
    pub fn api_base_url(&self) -> &str {
        self.api_base_url_override
            .as_deref()
            .unwrap_or(&self.api_base_url)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn inactivity_window(&self) -> Duration {
        Duration::from_secs(self.inactivity_minutes.max(1) * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
