//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/linkbox/config.toml)
//! 3. Environment variables (LINKBOX_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::StoreOptions;

/// Environment variable prefix
const ENV_PREFIX: &str = "LINKBOX";

/// Debounce values outside this range are clamped
const MIN_DEBOUNCE_MS: u64 = 50;
const MAX_DEBOUNCE_MS: u64 = 2000;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Location of the settings file (last opened document etc.)
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Coalescing window for document change notifications
    #[serde(default = "default_document_debounce_ms")]
    pub document_debounce_ms: u64,

    /// Coalescing window for settings change notifications
    #[serde(default = "default_settings_debounce_ms")]
    pub settings_debounce_ms: u64,

    /// Change events this soon after our own save are ignored
    #[serde(default = "default_self_write_window_ms")]
    pub self_write_window_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            document_debounce_ms: default_document_debounce_ms(),
            settings_debounce_ms: default_settings_debounce_ms(),
            self_write_window_ms: default_self_write_window_ms(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (LINKBOX_SETTINGS_PATH, LINKBOX_SELF_WRITE_WINDOW_MS)
    /// 2. Config file (~/.config/linkbox/config.toml or LINKBOX_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // LINKBOX_SETTINGS_PATH
        if let Ok(val) = std::env::var(format!("{}_SETTINGS_PATH", ENV_PREFIX)) {
            if !val.is_empty() {
                self.settings_path = PathBuf::from(val);
            }
        }

        // LINKBOX_SELF_WRITE_WINDOW_MS
        if let Ok(val) = std::env::var(format!("{}_SELF_WRITE_WINDOW_MS", ENV_PREFIX)) {
            match val.parse() {
                Ok(ms) => self.self_write_window_ms = ms,
                Err(_) => warn!("Ignoring invalid {}_SELF_WRITE_WINDOW_MS={:?}", ENV_PREFIX, val),
            }
        }
    }

    /// Save configuration to a file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with LINKBOX_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        config_dir().join("config.toml")
    }

    /// Store timing for the bookmark document
    pub fn document_options(&self) -> StoreOptions {
        StoreOptions {
            debounce: clamp_debounce(self.document_debounce_ms),
            self_write_window: Duration::from_millis(self.self_write_window_ms),
        }
    }

    /// Store timing for the settings file
    pub fn settings_options(&self) -> StoreOptions {
        StoreOptions {
            debounce: clamp_debounce(self.settings_debounce_ms),
            self_write_window: Duration::from_millis(self.self_write_window_ms),
        }
    }
}

fn clamp_debounce(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS))
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linkbox")
}

fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_document_debounce_ms() -> u64 {
    300
}

fn default_settings_debounce_ms() -> u64 {
    200
}

fn default_self_write_window_ms() -> u64 {
    500
}
