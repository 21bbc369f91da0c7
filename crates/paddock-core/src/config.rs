//! Application configuration management.
//!
//! This module handles loading the dashboard configuration: server address,
//! polling cadence, cache location and data provider URL.
//!
//! Configuration is stored at `~/.config/paddock/config.json`. Every field
//! is optional; command line flags override whatever the file says.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::poller::PollerSettings;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "paddock";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Cache file name
const CACHE_FILE: &str = "dashboard_data.json";

/// Environment variable overriding the provider base URL
pub const API_BASE_URL_ENV: &str = "PADDOCK_API_BASE_URL";

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_POLL_HOURS: u64 = 12;

/// Longest accepted poll interval (30 days)
pub const MAX_POLL_HOURS: u64 = 720;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub poll_hours: u64,
    pub cache_file: Option<PathBuf>,
    pub api_base_url: String,
    /// Delay before the first scheduled poll, so the server is up first
    pub startup_delay_secs: u64,
    /// How often the poller wakes to check whether a poll is due
    pub check_interval_secs: u64,
    /// Pause between provider requests within one poll
    pub request_spacing_secs: u64,
    /// Directory for a daily rolling log file; stderr only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            poll_hours: DEFAULT_POLL_HOURS,
            cache_file: None,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            startup_delay_secs: 30,
            check_interval_secs: 300,
            request_spacing_secs: 2,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load the config file if present, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_json(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get(API_BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Cache file location: configured path, else the user cache directory,
    /// else the working directory.
    pub fn cache_file(&self) -> PathBuf {
        if let Some(ref path) = self.cache_file {
            return path.clone();
        }
        dirs::cache_dir()
            .map(|dir| dir.join(APP_NAME).join(CACHE_FILE))
            .unwrap_or_else(|| PathBuf::from(CACHE_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_hours == 0 {
            anyhow::bail!("Poll interval must be at least 1 hour");
        }
        if self.poll_hours > MAX_POLL_HOURS {
            anyhow::bail!("Poll interval must be at most {} hours", MAX_POLL_HOURS);
        }
        if self.check_interval_secs == 0 {
            anyhow::bail!("Check interval must be at least 1 second");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_hours.saturating_mul(3600))
    }

    pub fn request_spacing(&self) -> Duration {
        Duration::from_secs(self.request_spacing_secs)
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: self.poll_interval(),
            startup_delay: Duration::from_secs(self.startup_delay_secs),
            check_interval: Duration::from_secs(self.check_interval_secs),
        }
    }
}
