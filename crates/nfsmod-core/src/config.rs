//! Host configuration loaded from `nfsmod.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Default config file name
pub const CONFIG_FILE: &str = "nfsmod.toml";

/// Timing defaults for the host loop
pub mod timing {
    /// Interval between mod update ticks (ms)
    pub const TICK_INTERVAL_MS: u64 = 1;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Executable name of the game to attach to
    pub process_name: String,
    /// Log fail-soft memory errors
    pub debug: bool,
    pub tick_interval_ms: u64,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub directory: PathBuf,
    /// Daily files are named `<file_prefix> MM-dd-YYYY.log`
    pub file_prefix: String,
    pub console: bool,
    pub file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_name: "speed.exe".to_string(),
            debug: false,
            tick_interval_ms: timing::TICK_INTERVAL_MS,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_prefix: "nfsmod".to_string(),
            console: true,
            file: true,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                warn!(
                    "Config file {} not found, using defaults",
                    path.as_ref().display()
                );
                Self::default()
            }
            Err(e) => {
                warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
