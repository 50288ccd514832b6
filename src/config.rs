//! # Configuration Management Module
//!
//! Persistent decoder settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `ecg_sample_rate_hz`: ECG output rate, one 8-lead group per sample
//! - `acc_sample_rate_hz`: Motion output rate, one sub-frame per sample
//! - `record_ecg` / `record_acc`: Which streams the session decodes
//! - `write_files`: Append records to `.ecg` / `.acc` files in `output_dir`
//! - `bus_topic`: Base topic for bus publishing, `None` disables the bus sink
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/cardio-telemetry/config.toml
//! - Linux: ~/.config/cardio-telemetry/config.toml
//! - Windows: %APPDATA%\cardio-telemetry\config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use crate::error::ConfigError;

const MILLIS_PER_SECOND: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ecg_sample_rate_hz: f64,
    pub acc_sample_rate_hz: f64,
    pub record_ecg: bool,
    pub record_acc: bool,
    pub write_files: bool,
    pub output_dir: PathBuf,
    pub bus_topic: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ecg_sample_rate_hz: 500.0,
            acc_sample_rate_hz: 104.0,
            record_ecg: true,
            record_acc: true,
            write_files: true,
            output_dir: PathBuf::from("."),
            bus_topic: None,
        }
    }
}

impl Config {
    /// Spacing between two ECG lead groups in milliseconds
    pub fn ecg_sample_interval_ms(&self) -> f64 {
        MILLIS_PER_SECOND / self.ecg_sample_rate_hz
    }

    /// Spacing between two motion sub-frames in milliseconds
    pub fn acc_sample_interval_ms(&self) -> f64 {
        MILLIS_PER_SECOND / self.acc_sample_rate_hz
    }

    /// Reject settings that would stall or reverse the sample clock
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("ecg_sample_rate_hz", self.ecg_sample_rate_hz),
            ("acc_sample_rate_hz", self.acc_sample_rate_hz),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }
        Ok(())
    }

    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cardio-telemetry")
            .join("config.toml")
    }

    /// Load config from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Load config from `path`, writing defaults there when the file is missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)
                    .map_err(ConfigError::ParseFailed)?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string)
            .map_err(ConfigError::WriteFailed)?;

        Ok(())
    }
}
