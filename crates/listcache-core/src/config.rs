//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: where
//! the API lives, which shop the device belongs to, how often to sync.
//!
//! Configuration is stored at `~/.config/listcache/config.json`; any value
//! can be overridden through `LISTCACHE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::REQUEST_TIMEOUT_SECS;
use crate::api::routes::DEFAULT_SHOP_ID;
use crate::offline::{SyncSettings, DEFAULT_MAX_RETRIES, DEFAULT_SYNC_INTERVAL_SECS};

/// Application name used for config/data directory paths
const APP_NAME: &str = "listcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// API base used when nothing is configured (the local proxy's `/api`)
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

pub const ENV_API_URL: &str = "LISTCACHE_API_URL";
pub const ENV_SHOP_ID: &str = "LISTCACHE_SHOP_ID";
pub const ENV_TOKEN: &str = "LISTCACHE_TOKEN";
pub const ENV_LOG_DIR: &str = "LISTCACHE_LOG_DIR";
pub const ENV_DATA_DIR: &str = "LISTCACHE_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub shop_id: String,
    /// Bearer token sent with every request, if the backend wants one
    pub token: Option<String>,
    pub sync_interval_secs: u64,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    /// Overrides the platform data directory for offline storage
    pub data_dir: Option<PathBuf>,
    /// Write a daily-rolling log file here in addition to stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            shop_id: DEFAULT_SHOP_ID.to_string(),
            token: None,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            data_dir: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(shop) = get(ENV_SHOP_ID) {
            self.shop_id = shop;
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.token = Some(token);
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the offline snapshot and pending queue
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            max_retries: self.max_retries,
            sync_interval: Duration::from_secs(self.sync_interval_secs.max(1)),
            ..SyncSettings::default()
        }
    }
}
