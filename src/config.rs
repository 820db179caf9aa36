//! Configuration management for the calibration tool
//!
//! This module provides runtime configuration loading from JSON files:
//! default operator inputs, the simulated flow meter layout, and where
//! calibration constants are stored. A missing or invalid file falls back to
//! defaults so the tool always starts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::VolumeUnit;

/// Default location of the config file
pub const DEFAULT_CONFIG_PATH: &str = "config/flowcal.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Operator input defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Reference volume offered when none is given
    pub default_volume: f64,
    /// Unit of `default_volume`
    pub default_unit: VolumeUnit,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            default_volume: 500.0,
            default_unit: VolumeUnit::Milliliters,
        }
    }
}

/// Simulated flow meter layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Gateway device identifiers
    pub devices: Vec<String>,
    /// Sensors per device, numbered from 1
    pub ports_per_device: u8,
    /// Counter value every sensor starts at
    pub initial_count: u64,
    /// Artificial round-trip per call (milliseconds)
    pub latency_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            devices: vec!["Device_001".to_string(), "Device_002".to_string()],
            ports_per_device: 4,
            initial_count: 10_000,
            latency_ms: 0,
        }
    }
}

/// Calibration store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file the constants are appended to
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("calibrations.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file doesn't exist
    /// or the JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Write configuration as pretty JSON, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
