//! Configuration types for NMedia.
//!
//! This module provides the [`Config`] struct which stores the server location,
//! paging and polling settings, and the persisted session. Configuration is
//! stored as TOML (typically at `~/.config/nmedia/config.toml` on Unix systems).
//!
//! # Example
//!
//! ```ignore
//! use nmedia_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.page_size = 20;
//! config.save()?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FeedError, Result};
use crate::model::AuthState;
use crate::repository::RemovePolicy;

const DEFAULT_SERVER_URL: &str = "http://localhost:9999/api";
const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// User-configurable settings and the persisted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base url of the posts API (e.g., "https://nmedia.example.com/api")
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// SQLite file holding the local mirror
    /// Falls back to `<data_dir>/nmedia/posts.db` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Posts requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Seconds between newer-post polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// What to do with a local deletion when the server rejects it
    #[serde(default)]
    pub remove_policy: RemovePolicy,

    // ========================================================================
    // Session
    // ========================================================================
    /// Signed-in user id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<i64>,

    /// Token for authenticated requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            database_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            remove_policy: RemovePolicy::default(),
            auth_id: None,
            auth_token: None,
        }
    }
}

impl Config {
    /// Poll interval as a [`Duration`], never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Persisted credentials, if both halves are present
    pub fn auth(&self) -> Option<AuthState> {
        match (self.auth_id, &self.auth_token) {
            (Some(id), Some(token)) => Some(AuthState {
                id,
                token: token.clone(),
            }),
            _ => None,
        }
    }

    /// Replace (or clear) the persisted credentials
    pub fn set_auth(&mut self, auth: Option<&AuthState>) {
        self.auth_id = auth.map(|a| a.id);
        self.auth_token = auth.map(|a| a.token.clone());
    }

    /// Resolve the SQLite file, preferring the configured path
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("nmedia").join("posts.db"))
            .ok_or(FeedError::NoConfigDir)
    }

    /// Get the config file path (~/.config/nmedia/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nmedia").join("config.toml"))
    }

    /// Load config from default location, or return default if file doesn't exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(FeedError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save config to a specific path, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
