//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Notification level and quiet hours
//! - Gap detection bounds and scan window length
//!
//! Configuration is stored at `~/.config/gapfit/config.toml`.

use std::path::PathBuf;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::notify::{NotificationPolicy, PolicyLevel};

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_level")]
    pub level: PolicyLevel,
    #[serde(default = "default_true")]
    pub quiet_hours_enabled: bool,
    #[serde(default = "default_quiet_start")]
    pub quiet_hours_start: NaiveTime,
    #[serde(default = "default_quiet_end")]
    pub quiet_hours_end: NaiveTime,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            quiet_hours_enabled: true,
            quiet_hours_start: default_quiet_start(),
            quiet_hours_end: default_quiet_end(),
        }
    }
}

/// Gap scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_min_gap_seconds")]
    pub min_gap_seconds: i64,
    #[serde(default = "default_max_gap_seconds")]
    pub max_gap_seconds: i64,
    #[serde(default = "default_scan_window_hours")]
    pub scan_window_hours: i64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_gap_seconds: default_min_gap_seconds(),
            max_gap_seconds: default_max_gap_seconds(),
            scan_window_hours: default_scan_window_hours(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/gapfit/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

impl Config {
    /// Load from the default path, falling back to defaults when the file
    /// does not exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::path()?)
    }

    /// Load from an explicit path.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::path()?)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Derive the notification policy from the configured options.
    pub fn policy(&self) -> NotificationPolicy {
        NotificationPolicy {
            level: self.notifications.level,
            quiet_hours_enabled: self.notifications.quiet_hours_enabled,
            quiet_hours_start: self.notifications.quiet_hours_start,
            quiet_hours_end: self.notifications.quiet_hours_end,
        }
    }

    /// Validate value ranges, rejecting inverted gap bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.min_gap_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "scan.min_gap_seconds".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.scan.max_gap_seconds < self.scan.min_gap_seconds {
            return Err(ConfigError::InvalidValue {
                key: "scan.max_gap_seconds".to_string(),
                message: "must be at least min_gap_seconds".to_string(),
            });
        }
        if self.scan.scan_window_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "scan.scan_window_hours".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn default_level() -> PolicyLevel {
    PolicyLevel::Balanced
}

fn default_true() -> bool {
    true
}

fn default_quiet_start() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default()
}

fn default_quiet_end() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default()
}

fn default_min_gap_seconds() -> i64 {
    60
}

fn default_max_gap_seconds() -> i64 {
    300
}

fn default_scan_window_hours() -> i64 {
    48
}
