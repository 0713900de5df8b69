//! Application configuration
//!
//! This module re-exports the shared config type from bossfall-types and
//! provides persistence and path resolution for it.

use std::path::PathBuf;

use chrono::TimeDelta;
use chrono_tz::Tz;
use tracing::warn;

pub use bossfall_types::AppConfig;

use super::error::ConfigError;
use crate::engine::EngineSettings;
use crate::storage::default_data_dir;

const APP_NAME: &str = "bossfall";
const CONFIG_NAME: &str = "config";

/// File name used when `definitions_file` is empty
pub const DEFINITIONS_FILE: &str = "encounters.toml";

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for AppConfig persistence and resolution
pub trait AppConfigExt {
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>
    where
        Self: Sized;
    fn load_with_defaults() -> Self;
    fn save(self) -> Result<(), ConfigError>;
    fn data_dir(&self) -> PathBuf;
    fn definitions_path(&self) -> PathBuf;
    fn parse_zone(&self) -> Result<Tz, ConfigError>;
    fn default_zone(&self) -> Tz;
    fn engine_settings(&self) -> EngineSettings;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load configuration, using defaults");
            Self::load_with_defaults()
        })
    }

    fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn load_with_defaults() -> Self {
        AppConfig::with_data_directory(default_data_dir().to_string_lossy().into_owned())
    }

    fn save(self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn data_dir(&self) -> PathBuf {
        if self.data_directory.trim().is_empty() {
            default_data_dir()
        } else {
            PathBuf::from(&self.data_directory)
        }
    }

    /// Relative definition paths resolve against the data directory
    fn definitions_path(&self) -> PathBuf {
        let file = self.definitions_file.trim();
        if file.is_empty() {
            return self.data_dir().join(DEFINITIONS_FILE);
        }
        let path = PathBuf::from(file);
        if path.is_absolute() {
            path
        } else {
            self.data_dir().join(path)
        }
    }

    fn parse_zone(&self) -> Result<Tz, ConfigError> {
        self.default_timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone {
                zone: self.default_timezone.clone(),
            })
    }

    fn default_zone(&self) -> Tz {
        self.parse_zone().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to UTC");
            Tz::UTC
        })
    }

    fn engine_settings(&self) -> EngineSettings {
        let millis = |ms: u64| TimeDelta::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX));
        EngineSettings {
            default_zone: self.default_zone(),
            tick_interval: millis(self.tick_interval_ms.max(1)),
            delivery_delay: millis(self.pending_delivery_delay_secs.saturating_mul(1000)),
            flush_debounce: millis(self.pending_flush_debounce_ms),
        }
    }
}
