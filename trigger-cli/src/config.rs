//! Configuration loading for the bluezcript CLI.
//!
//! Configuration is loaded from a TOML file (default: `bluezcript.toml` in
//! the data directory). A missing default file means all defaults; a
//! missing file named with `--config` is an error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use trigger_types::COMPANY_ID;

/// Default config file name inside the data directory.
pub const CONFIG_FILE: &str = "bluezcript.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Credential store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Output framing configuration.
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Credential store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Directory holding pairing records (default: `<data_dir>/pairings`).
    pub dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is not set.
    pub filter: Option<String>,
}

/// How triggered frames are written out.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// BLE company id prefixed to manufacturer data (default: 0xFFFF).
    #[serde(default = "default_company_id")]
    pub company_id: u16,
    /// Frame format (default: manufacturer).
    #[serde(default)]
    pub format: FrameFormat,
}

/// Output frame layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Company id (little-endian) followed by the 13-byte payload.
    #[default]
    Manufacturer,
    /// The bare 13-byte payload.
    Payload,
}

// Default value functions
fn default_company_id() -> u16 {
    COMPANY_ID
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            company_id: default_company_id(),
            format: FrameFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `explicit` if given, else `<data_dir>/bluezcript.toml` if it
    /// exists, else defaults.
    pub fn load(data_dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = data_dir.join(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Resolved credential directory.
    pub fn store_dir(&self, data_dir: &Path) -> PathBuf {
        self.store
            .dir
            .clone()
            .unwrap_or_else(|| data_dir.join("pairings"))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
