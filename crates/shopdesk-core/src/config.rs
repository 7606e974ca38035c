//! Application configuration management.
//!
//! This module handles loading and saving the configuration, which holds
//! the API origin, session timing and the activity kinds that count as
//! user interaction.
//!
//! Configuration is stored at `~/.config/shopdesk/config.json`; missing
//! fields take their defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::session::DEFAULT_SESSION_LIFETIME_MINUTES;
use crate::monitor::inactivity::{DEFAULT_EXPIRATION_POLL, DEFAULT_IDLE_LIMIT};
use crate::monitor::{ActivityKind, MonitorSettings};

/// Application name used for config/storage directory paths
const APP_NAME: &str = "shopdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API origin
pub const API_URL_ENV: &str = "SHOPDESK_API_URL";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub idle_limit_secs: u64,
    pub expiration_poll_secs: u64,
    pub session_lifetime_mins: i64,
    pub tracked_activity: Vec<ActivityKind>,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            idle_limit_secs: DEFAULT_IDLE_LIMIT.as_secs(),
            expiration_poll_secs: DEFAULT_EXPIRATION_POLL.as_secs(),
            session_lifetime_mins: DEFAULT_SESSION_LIFETIME_MINUTES,
            tracked_activity: ActivityKind::default_tracked(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session and list caches.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn session_lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_lifetime_mins.max(1))
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            idle_limit: Duration::from_secs(self.idle_limit_secs.max(1)),
            poll_interval: Duration::from_secs(self.expiration_poll_secs.max(1)),
            tracked: self.tracked_activity.clone(),
        }
    }
}
