//! Client configuration.
//!
//! `ClientConfig` comes from the environment (the API origin is never
//! compiled in). `Settings` holds user preferences that persist between
//! runs at `~/.config/hrportal/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::guard::DEFAULT_SIGN_IN_PATH;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "hrportal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const API_URL_VAR: &str = "HRPORTAL_API_URL";
pub const TIMEOUT_VAR: &str = "HRPORTAL_TIMEOUT_SECS";
pub const APP_ORIGIN_VAR: &str = "HRPORTAL_APP_ORIGIN";

/// HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Origin the web frontend runs on, used for OAuth callback URLs.
const DEFAULT_APP_ORIGIN: &str = "http://localhost:5173";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub sign_in_path: String,
    pub app_origin: String,
}

impl ClientConfig {
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_url(API_URL_VAR, api_url)?,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            app_origin: DEFAULT_APP_ORIGIN.to_string(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup(API_URL_VAR).ok_or(ConfigError::Missing(API_URL_VAR))?;
        let mut config = Self::new(&api_url)?;

        if let Some(value) = lookup(TIMEOUT_VAR) {
            config.request_timeout_secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidNumber {
                    var: TIMEOUT_VAR,
                    value,
                })?;
        }
        if let Some(value) = lookup(APP_ORIGIN_VAR) {
            config.app_origin = normalize_url(APP_ORIGIN_VAR, &value)?;
        }
        Ok(config)
    }
}

fn normalize_url(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .map(|rest| !rest.is_empty())
        .unwrap_or(false);
    if !has_host {
        return Err(ConfigError::InvalidUrl {
            var,
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Where the session record is kept between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub last_employee_id: Option<String>,
    #[serde(default)]
    pub storage: StorageKind,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
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

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
