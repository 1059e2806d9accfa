// Configuration management module
// Loads, validates and persists the backlight control settings

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// X display to connect to; `$DISPLAY` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Pause after each property write, in microseconds
    #[serde(default = "default_settle_delay_us")]
    pub settle_delay_us: u64,
    /// Percent per scroll tick on the panel slider
    #[serde(default = "default_scroll_step")]
    pub scroll_step: f64,
}

fn default_settle_delay_us() -> u64 {
    200
}

fn default_scroll_step() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Config {
            display: None,
            settle_delay_us: default_settle_delay_us(),
            scroll_step: default_scroll_step(),
        }
    }
}

impl Config {
    /// Load configuration from the XDG config directory
    /// If the file doesn't exist, create a default configuration
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_dir())
    }

    /// Load configuration from `config_dir`, writing defaults there if it has none
    pub fn load_from(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to(config_dir)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            Error::config_error(
                config_path.display().to_string(),
                format!("Failed to read config file: {}", e),
            )
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::ConfigSyntax(format!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the XDG config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_dir())
    }

    pub fn save_to(&self, config_dir: &Path) -> Result<()> {
        self.validate()?;

        let config_path = config_dir.join(CONFIG_FILE);

        fs::create_dir_all(config_dir).map_err(|e| {
            Error::config_error(
                config_dir.display().to_string(),
                format!("Failed to create config directory: {}", e),
            )
        })?;

        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::config_error(
                config_path.display().to_string(),
                format!("Failed to serialize config: {}", e),
            )
        })?;

        // Write to temporary file first, then rename for atomic operation
        let temp_path = config_dir.join(".config.toml.tmp");

        fs::write(&temp_path, &content).map_err(|e| {
            Error::config_error(
                temp_path.display().to_string(),
                format!("Failed to write temporary config file: {}", e),
            )
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::config_error(
                config_path.display().to_string(),
                format!("Failed to save config file: {}", e),
            )
        })?;

        Ok(())
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if !(self.scroll_step > 0.0 && self.scroll_step <= 100.0) {
            return Err(Error::ConfigValidation(format!(
                "scroll_step must be in (0, 100], got {}",
                self.scroll_step
            )));
        }

        if self.settle_delay_us > 1_000_000 {
            return Err(Error::ConfigValidation(format!(
                "settle_delay_us of {} is longer than a second (default: {})",
                self.settle_delay_us,
                default_settle_delay_us()
            )));
        }

        if let Some(display) = &self.display {
            if display.trim().is_empty() {
                return Err(Error::ConfigValidation(
                    "display must not be empty; remove it to use $DISPLAY".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_micros(self.settle_delay_us)
    }

    /// Get the configuration directory using XDG config directory
    pub fn get_config_dir() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".config")
            });

        config_dir.join("randr-backlight")
    }
}
