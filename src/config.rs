//! Configuration management for axterm.
//!
//! Settings are read from `~/.axterm/config.toml`:
//!
//! ```toml
//! [accessibility]
//! # auto: on where Voice Control exists (macOS), on, off
//! enabled = "auto"
//! # Minimum gap between two notifications of the same kind
//! debounce_ms = 100
//!
//! [terminal]
//! cols = 80
//! rows = 24
//! scrollback_limit = 10000
//! ```
//!
//! The `AXTERM_ACCESSIBILITY` environment variable overrides `enabled`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::accessibility::{AccessibilitySettings, Enablement};
use crate::core::grid::DEFAULT_SCROLLBACK_LIMIT;

/// Directory under the home directory holding config and log files
pub const CONFIG_DIR: &str = ".axterm";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub accessibility: AccessibilityConfig,
    pub terminal: TerminalConfig,
}

/// Accessibility configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityConfig {
    pub enabled: Enablement,
    pub debounce_ms: u64,
}

impl Default for AccessibilityConfig {
    fn default() -> Self {
        Self {
            enabled: Enablement::Auto,
            debounce_ms: 100,
        }
    }
}

/// Terminal geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub cols: u16,
    pub rows: u16,
    pub scrollback_limit: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            scrollback_limit: DEFAULT_SCROLLBACK_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            warn!("no home directory, using default config");
            return Self::default();
        };
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}, using default config", e);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        let dir = config_dir().ok_or(ConfigError::NoHomeDir)?;
        fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
            path: dir.clone(),
            source,
        })?;
        self.save_to(&dir.join("config.toml"))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file path
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.accessibility.debounce_ms)
    }

    /// Accessibility settings for this process, environment override applied
    pub fn settings(&self) -> AccessibilitySettings {
        AccessibilitySettings::from_env(self.accessibility.enabled, self.debounce())
    }
}

/// `~/.axterm`
pub fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_DIR))
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
