//! Configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timing configuration for the sync/dispatch core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Periodic status poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How long the manual-refresh notice stays visible, in milliseconds
    #[serde(default = "default_refresh_notice")]
    pub refresh_notice_ms: u64,
    /// How long operation outcomes stay visible, in milliseconds
    #[serde(default = "default_outcome_display")]
    pub outcome_display_ms: u64,
    /// Timeout for status/identifier/driver-info fetches, in milliseconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,
    /// Timeout for driver-mutating operations, in milliseconds.
    /// Generous: driver-store work is slow but must not hang forever.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
}

fn default_poll_interval() -> u64 {
    500
}
fn default_refresh_notice() -> u64 {
    2000
}
fn default_outcome_display() -> u64 {
    5000
}
fn default_fetch_timeout() -> u64 {
    5000
}
fn default_operation_timeout() -> u64 {
    30_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            refresh_notice_ms: default_refresh_notice(),
            outcome_display_ms: default_outcome_display(),
            fetch_timeout_ms: default_fetch_timeout(),
            operation_timeout_ms: default_operation_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file, falling back to defaults
    /// if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "haybox", "HayboxCompanion")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn refresh_notice(&self) -> Duration {
        Duration::from_millis(self.refresh_notice_ms)
    }

    pub fn outcome_display(&self) -> Duration {
        Duration::from_millis(self.outcome_display_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}
