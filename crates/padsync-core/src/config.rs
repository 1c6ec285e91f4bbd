//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/padsync/config.toml)
//! 3. Environment variables (PADSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::presenter::DEFAULT_TOAST_DURATION;
use crate::sync::{ChannelConfig, SavePolicy, DEFAULT_RECONNECT_DELAY, DEFAULT_SAVE_DELAY};

/// Environment variable prefix
const ENV_PREFIX: &str = "PADSYNC";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Notepad server base URL
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Quiet period after the last edit before an automatic save
    #[serde(default = "default_save_delay_ms")]
    pub save_delay_ms: u64,

    /// Save as soon as a line is completed
    #[serde(default = "default_true")]
    pub flush_on_newline: bool,

    /// Fixed delay between push-channel reconnect attempts
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// How long notifications stay visible
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            save_delay_ms: default_save_delay_ms(),
            flush_on_newline: true,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            toast_duration_ms: default_toast_duration_ms(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PADSYNC_SERVER_URL, PADSYNC_SAVE_DELAY_MS, ...)
    /// 2. Config file (~/.config/padsync/config.toml or PADSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
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
    ///
    /// Unparseable numeric values are ignored.
    fn apply_env_overrides(&mut self) {
        // PADSYNC_SERVER_URL
        if let Ok(val) = std::env::var(format!("{}_SERVER_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.server_url = val;
            }
        }

        // PADSYNC_SAVE_DELAY_MS
        if let Some(ms) = env_millis("SAVE_DELAY_MS") {
            self.save_delay_ms = ms;
        }

        // PADSYNC_FLUSH_ON_NEWLINE
        if let Ok(val) = std::env::var(format!("{}_FLUSH_ON_NEWLINE", ENV_PREFIX)) {
            self.flush_on_newline = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // PADSYNC_RECONNECT_DELAY_MS
        if let Some(ms) = env_millis("RECONNECT_DELAY_MS") {
            self.reconnect_delay_ms = ms;
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PADSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("padsync")
            .join("config.toml")
    }

    /// Save policy derived from the configured delays
    pub fn save_policy(&self) -> SavePolicy {
        SavePolicy {
            delay: Duration::from_millis(self.save_delay_ms),
            flush_on_newline: self.flush_on_newline,
        }
    }

    /// Channel configuration for `channel_url`
    pub fn channel_config(&self, channel_url: impl Into<String>) -> ChannelConfig {
        ChannelConfig::new(channel_url)
            .with_reconnect_delay(Duration::from_millis(self.reconnect_delay_ms))
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}

fn env_millis(suffix: &str) -> Option<u64> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix))
        .ok()
        .and_then(|v| v.trim().parse().ok())
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_save_delay_ms() -> u64 {
    DEFAULT_SAVE_DELAY.as_millis() as u64
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}

fn default_toast_duration_ms() -> u64 {
    DEFAULT_TOAST_DURATION.as_millis() as u64
}

fn default_true() -> bool {
    true
}
